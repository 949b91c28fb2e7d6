//! Top-level editor controller.
//!
//! [`DeckEditor`] owns the single mutable deck, the history log, the coarse
//! generation status, and the slide selection. Structural operations are
//! bracketed by history checkpoints; keystroke-level field edits mutate the
//! deck directly and are reconciled into history at the next
//! [`checkpoint`](DeckEditor::checkpoint). Media jobs run one per
//! invocation: the slide is optimistically marked as loading, the client
//! call runs with the state lock released, and the completion is reconciled
//! against the live deck. Each job carries an id minted at call start so a
//! completion that lost the slide to a newer job is dropped instead of
//! overwriting it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use deckgen_common::{
    Deck, DeckSnapshot, GenerationStatus, MediaKind, Slide, SlideLayout,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use deckgen_gemini::GeminiClient;

use crate::client::GenerationClient;
use crate::config::Config;
use crate::error::{EditorError, Result};
use crate::events::{EditorEvent, NoticeLevel};
use crate::history::HistoryLog;
use crate::storage::{JsonFileStore, ProjectStore, SavedProject};

/// Prompts shorter than this with no comma look terse enough to be worth a
/// refinement pass before media generation.
pub const REFINE_PROMPT_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

struct EditorState {
    deck: Deck,
    status: GenerationStatus,
    current_slide: usize,
    history: HistoryLog,
    /// Latest media job id per slide; completions that no longer match are
    /// stale and dropped.
    media_jobs: HashMap<String, u64>,
    next_job_id: u64,
}

impl EditorState {
    fn new() -> Self {
        Self {
            deck: Deck::default(),
            status: GenerationStatus::Idle,
            current_slide: 0,
            history: HistoryLog::new(),
            media_jobs: HashMap::new(),
            next_job_id: 0,
        }
    }
}

pub struct DeckEditor {
    state: Mutex<EditorState>,
    client: Arc<dyn GenerationClient>,
    store: Arc<dyn ProjectStore>,
    tx: mpsc::UnboundedSender<EditorEvent>,
    rx: Mutex<mpsc::UnboundedReceiver<EditorEvent>>,
}

impl DeckEditor {
    pub fn new(client: Arc<dyn GenerationClient>, store: Arc<dyn ProjectStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(EditorState::new()),
            client,
            store,
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Wire an editor to the Gemini client and the JSON file store using
    /// env-derived configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EditorError::Config("GEMINI_API_KEY is not set".to_string()))?;

        let mut client = GeminiClient::new(api_key);
        if let Some(model) = &config.text_model {
            client = client.with_text_model(model.clone());
        }
        if let Some(model) = &config.image_model {
            client = client.with_image_model(model.clone());
        }
        if let Some(model) = &config.video_model {
            client = client.with_video_model(model.clone());
        }

        let store = match &config.project_path {
            Some(path) => JsonFileStore::new(path.clone()),
            None => JsonFileStore::default_path(),
        };

        Ok(Self::new(Arc::new(client), Arc::new(store)))
    }

    // ---- lifecycle -------------------------------------------------------

    /// Restore a prior session from the store, if one exists. Seeds the
    /// history with exactly one entry: the restored state.
    pub async fn load_project(&self) -> Result<bool> {
        let Some(saved) = self.store.load()? else {
            return Ok(false);
        };
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        st.deck = Deck::new(saved.title, saved.slides);
        st.current_slide = 0;
        st.status = GenerationStatus::Complete;
        st.history.clear();
        let snapshot = DeckSnapshot::capture(&st.deck);
        st.history.push(snapshot);
        self.emit(EditorEvent::StatusChanged(GenerationStatus::Complete));
        tracing::info!(slides = st.deck.slides.len(), "project restored");
        Ok(true)
    }

    /// Reset to an empty deck, clear the history and the persisted blob.
    pub async fn delete_project(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        st.deck = Deck::default();
        st.current_slide = 0;
        st.status = GenerationStatus::Idle;
        st.history.clear();
        st.media_jobs.clear();
        self.emit(EditorEvent::StatusChanged(GenerationStatus::Idle));
        self.store.clear()?;
        Ok(())
    }

    /// Structure the topic and notes into a fresh deck. On failure the deck
    /// is left untouched and the status moves to `Error`.
    pub async fn generate_outline(&self, topic: &str, notes: &str) {
        {
            let mut st = self.state.lock().await;
            if st.status.is_busy() {
                self.notice(NoticeLevel::Warning, "Generation is already in progress");
                return;
            }
            // Regeneration over an existing deck: checkpoint it first so
            // undo can bring it back.
            if st.status == GenerationStatus::Complete && !st.deck.is_empty() {
                let snapshot = DeckSnapshot::capture(&st.deck);
                st.history.push(snapshot);
            }
            st.status = GenerationStatus::Analyzing;
            self.emit(EditorEvent::StatusChanged(GenerationStatus::Analyzing));
        }

        match self.client.structure_from_notes(topic, notes).await {
            Ok(drafts) => {
                let mut guard = self.state.lock().await;
                let st = &mut *guard;
                let slides: Vec<Slide> = drafts
                    .into_iter()
                    .map(|d| Slide::from_draft(Uuid::new_v4().to_string(), d))
                    .collect();
                st.deck = Deck::new(topic, slides);
                st.current_slide = 0;
                st.status = GenerationStatus::Complete;
                let snapshot = DeckSnapshot::capture(&st.deck);
                st.history.push(snapshot);
                self.emit(EditorEvent::StatusChanged(GenerationStatus::Complete));
                self.emit(EditorEvent::OutlineReady {
                    slide_count: st.deck.slides.len(),
                });
                self.persist_locked(st);
            }
            Err(e) => {
                let mut st = self.state.lock().await;
                st.status = GenerationStatus::Error;
                self.emit(EditorEvent::StatusChanged(GenerationStatus::Error));
                tracing::error!(error = %e, "structuring failed");
                self.notice(
                    NoticeLevel::Error,
                    format!("Could not generate the presentation: {e}"),
                );
            }
        }
    }

    // ---- structural edits (checkpoint-bracketed) -------------------------

    /// Insert a default slide after the current one and select it.
    pub async fn add_slide(&self) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.status != GenerationStatus::Complete {
            return;
        }
        st.history.push(DeckSnapshot::capture(&st.deck));
        let at = (st.current_slide + 1).min(st.deck.slides.len());
        st.deck.slides.insert(at, default_slide());
        st.current_slide = at;
        st.history.push(DeckSnapshot::capture(&st.deck));
        self.persist_locked(st);
    }

    /// Remove the slide at `index`. Refused when it is the only one left.
    pub async fn delete_slide(&self, index: usize) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.status != GenerationStatus::Complete || index >= st.deck.slides.len() {
            return;
        }
        if st.deck.slides.len() == 1 {
            self.notice(NoticeLevel::Warning, "A deck needs at least one slide");
            return;
        }
        st.history.push(DeckSnapshot::capture(&st.deck));
        st.deck.slides.remove(index);
        if st.current_slide >= index && st.current_slide > 0 {
            st.current_slide -= 1;
        }
        st.history.push(DeckSnapshot::capture(&st.deck));
        self.persist_locked(st);
    }

    /// Swap the slide at `index` with its neighbor. No-op at either
    /// boundary. Selection follows the moved slide or its swap partner.
    pub async fn move_slide(&self, index: usize, direction: MoveDirection) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.status != GenerationStatus::Complete || index >= st.deck.slides.len() {
            return;
        }
        let target = match direction {
            MoveDirection::Up => {
                if index == 0 {
                    return;
                }
                index - 1
            }
            MoveDirection::Down => {
                if index + 1 >= st.deck.slides.len() {
                    return;
                }
                index + 1
            }
        };
        st.history.push(DeckSnapshot::capture(&st.deck));
        st.deck.slides.swap(index, target);
        if st.current_slide == index {
            st.current_slide = target;
        } else if st.current_slide == target {
            st.current_slide = index;
        }
        st.history.push(DeckSnapshot::capture(&st.deck));
        self.persist_locked(st);
    }

    /// Rewrite the layout of the currently selected slide.
    pub async fn set_layout(&self, layout: SlideLayout) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.status != GenerationStatus::Complete {
            return;
        }
        let i = st.current_slide;
        if st.deck.slides.get(i).is_none() {
            return;
        }
        st.history.push(DeckSnapshot::capture(&st.deck));
        if let Some(slide) = st.deck.slides.get_mut(i) {
            slide.layout = layout;
        }
        st.history.push(DeckSnapshot::capture(&st.deck));
        self.persist_locked(st);
    }

    // ---- field edits (checkpoint on blur) --------------------------------

    pub async fn set_deck_title(&self, title: impl Into<String>) {
        let mut st = self.state.lock().await;
        if st.status != GenerationStatus::Complete {
            return;
        }
        st.deck.title = title.into();
        self.persist_locked(&st);
    }

    /// Apply a free-text edit to the current slide. The slide id must not be
    /// touched. No checkpoint: edits are reconciled at the next
    /// [`checkpoint`](Self::checkpoint).
    pub async fn update_current_slide(&self, f: impl FnOnce(&mut Slide)) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.status != GenerationStatus::Complete {
            return;
        }
        let i = st.current_slide;
        if let Some(slide) = st.deck.slides.get_mut(i) {
            f(slide);
        }
        self.persist_locked(st);
    }

    /// Record the deck if it changed since the last checkpoint; called on
    /// field blur and before async jobs.
    pub async fn checkpoint(&self) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        st.history.save_snapshot(&st.deck);
    }

    // ---- undo / redo -----------------------------------------------------

    pub async fn undo(&self) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        let Some(snapshot) = st.history.undo() else {
            return;
        };
        st.history.begin_restore();
        snapshot.restore(&mut st.deck);
        st.history.end_restore();
        st.current_slide = clamp_selection(st.current_slide, st.deck.slides.len());
        self.persist_locked(st);
    }

    pub async fn redo(&self) {
        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        let Some(snapshot) = st.history.redo() else {
            return;
        };
        st.history.begin_restore();
        snapshot.restore(&mut st.deck);
        st.history.end_restore();
        st.current_slide = clamp_selection(st.current_slide, st.deck.slides.len());
        self.persist_locked(st);
    }

    // ---- media workflow --------------------------------------------------

    /// Run one media-generation job for the slide. The slide is marked as
    /// loading and given the requested kind before the call resolves; the
    /// completion is written back onto the live deck, or dropped when a
    /// newer job has taken over the slide in the meantime.
    pub async fn generate_media(&self, slide_id: &str, kind: MediaKind) {
        if kind == MediaKind::None {
            return;
        }

        let prompt;
        let slide_title;
        let job_id;
        {
            let mut guard = self.state.lock().await;
            let st = &mut *guard;
            // Pre-job checkpoint: the prior good state undo falls back to.
            st.history.push(DeckSnapshot::capture(&st.deck));
            let Some(slide) = st.deck.slide_mut(slide_id) else {
                tracing::debug!(slide_id, "media request for unknown slide ignored");
                return;
            };
            slide.generating = true;
            slide.media_kind = kind;
            prompt = slide.image_prompt.clone();
            slide_title = slide.title.clone();
            job_id = st.next_job_id;
            st.next_job_id += 1;
            st.media_jobs.insert(slide_id.to_string(), job_id);
        }

        let resolved = if should_refine(&prompt) {
            match self.client.refine_prompt(&prompt, &slide_title).await {
                Ok(refined) => refined,
                Err(e) => {
                    tracing::warn!(error = %e, "prompt refinement failed, keeping original");
                    prompt.clone()
                }
            }
        } else {
            prompt.clone()
        };

        let result = match kind {
            MediaKind::Image => self.client.image_from_prompt(&resolved).await,
            MediaKind::Video => self.client.video_from_prompt(&resolved).await,
            MediaKind::None => unreachable!("guarded above"),
        };

        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        if st.media_jobs.get(slide_id) != Some(&job_id) {
            tracing::debug!(slide_id, job_id, "stale media completion dropped");
            return;
        }
        st.media_jobs.remove(slide_id);

        match result {
            Ok(Some(url)) => {
                if let Some(slide) = st.deck.slide_mut(slide_id) {
                    slide.media_url = Some(url);
                    slide.media_kind = kind;
                    slide.generating = false;
                }
                st.history.push(DeckSnapshot::capture(&st.deck));
                self.emit(EditorEvent::MediaReady {
                    slide_id: slide_id.to_string(),
                });
                self.persist_locked(st);
            }
            Ok(None) => {
                // The model declined; reset to no-media. The post-job
                // checkpoint is still pushed.
                if let Some(slide) = st.deck.slide_mut(slide_id) {
                    slide.generating = false;
                    slide.media_kind = MediaKind::None;
                    slide.media_url = None;
                }
                st.history.push(DeckSnapshot::capture(&st.deck));
                self.persist_locked(st);
            }
            Err(e) => {
                if let Some(slide) = st.deck.slide_mut(slide_id) {
                    slide.generating = false;
                    slide.media_kind = MediaKind::None;
                    slide.media_url = None;
                }
                tracing::error!(error = %e, slide_id, "media generation failed");
                self.notice(
                    NoticeLevel::Error,
                    format!("Media generation failed: {e}"),
                );
                // No post-job checkpoint: the pre-job entry already holds
                // the state undo should reach.
            }
        }
    }

    // ---- accessors -------------------------------------------------------

    pub async fn deck(&self) -> Deck {
        self.state.lock().await.deck.clone()
    }

    pub async fn status(&self) -> GenerationStatus {
        self.state.lock().await.status
    }

    pub async fn current_slide(&self) -> usize {
        self.state.lock().await.current_slide
    }

    pub async fn select_slide(&self, index: usize) {
        let mut st = self.state.lock().await;
        st.current_slide = clamp_selection(index, st.deck.slides.len());
    }

    pub async fn can_undo(&self) -> bool {
        self.state.lock().await.history.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.state.lock().await.history.can_redo()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Await the next editor event. The shell drives its redraws from this.
    pub async fn next_event(&self) -> Option<EditorEvent> {
        self.rx.lock().await.recv().await
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub async fn try_next_event(&self) -> Option<EditorEvent> {
        self.rx.lock().await.try_recv().ok()
    }

    // ---- internals -------------------------------------------------------

    fn emit(&self, event: EditorEvent) {
        let _ = self.tx.send(event);
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => tracing::error!(%message, "notice"),
            NoticeLevel::Warning => tracing::warn!(%message, "notice"),
            NoticeLevel::Info => tracing::info!(%message, "notice"),
        }
        self.emit(EditorEvent::Notice { level, message });
    }

    /// Best-effort save; only a complete, non-empty deck is persisted.
    fn persist_locked(&self, st: &EditorState) {
        if st.status != GenerationStatus::Complete || st.deck.is_empty() {
            return;
        }
        let project = SavedProject {
            title: st.deck.title.clone(),
            slides: st.deck.slides.clone(),
            saved_at: Utc::now(),
        };
        if let Err(e) = self.store.save(&project) {
            tracing::warn!(error = %e, "project save failed");
        }
    }
}

fn default_slide() -> Slide {
    Slide {
        id: Uuid::new_v4().to_string(),
        layout: SlideLayout::Center,
        title: "New Slide".to_string(),
        subtitle: None,
        bullets: vec!["Add your content here".to_string()],
        image_prompt: "abstract gradient background".to_string(),
        media_kind: MediaKind::None,
        media_url: None,
        generating: false,
        notes: None,
    }
}

fn clamp_selection(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}

/// Terse, comma-free prompts get a refinement pass.
fn should_refine(prompt: &str) -> bool {
    prompt.len() < REFINE_PROMPT_MAX_LEN && !prompt.contains(',')
}
