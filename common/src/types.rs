use serde::{Deserialize, Serialize};

/// Slide layouts the structuring model is allowed to pick from.
/// Wire names are the kebab-case strings the model emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideLayout {
    Title,
    SplitLeft,
    SplitRight,
    Center,
    ImageHeavy,
    Data,
    Conclusion,
}

impl SlideLayout {
    /// Parse a wire name, falling back to `Center` for anything unknown.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "title" => Self::Title,
            "split-left" => Self::SplitLeft,
            "split-right" => Self::SplitRight,
            "center" => Self::Center,
            "image-heavy" => Self::ImageHeavy,
            "data" => Self::Data,
            "conclusion" => Self::Conclusion,
            _ => Self::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    None,
    Image,
    Video,
}

impl Default for MediaKind {
    fn default() -> Self {
        MediaKind::None
    }
}

/// One deck entry. `id` is assigned once on creation and never changes;
/// `generating` is transient UI state and stays out of the persisted blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: String,
    pub layout: SlideLayout,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub image_prompt: String,
    #[serde(default)]
    pub media_kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip)]
    pub generating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Slide {
    /// Build a slide from a structuring draft, with media state zeroed.
    pub fn from_draft(id: String, draft: SlideDraft) -> Self {
        Self {
            id,
            layout: draft.layout,
            title: draft.title,
            subtitle: draft.subtitle,
            bullets: draft.bullets,
            image_prompt: draft.image_prompt,
            media_kind: MediaKind::None,
            media_url: None,
            generating: false,
            notes: draft.notes,
        }
    }

    /// Locator present implies a media kind; used by tests and debug asserts.
    pub fn media_consistent(&self) -> bool {
        self.media_url.is_none() || self.media_kind != MediaKind::None
    }
}

/// What the structuring call yields per slide. Identity and media state
/// are assigned by the editor on receipt, never trusted from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideDraft {
    pub layout: SlideLayout,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A presentation: title plus slides in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn new(title: impl Into<String>, slides: Vec<Slide>) -> Self {
        Self {
            title: title.into(),
            slides,
        }
    }

    pub fn slide(&self, id: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }

    pub fn slide_mut(&mut self, id: &str) -> Option<&mut Slide> {
        self.slides.iter_mut().find(|s| s.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// Coarse top-level mode gating which view the shell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Idle,
    Analyzing,
    Structuring,
    Visualizing,
    Complete,
    Error,
}

impl Default for GenerationStatus {
    fn default() -> Self {
        GenerationStatus::Idle
    }
}

impl GenerationStatus {
    /// A structuring request is in flight; editing and re-generation wait.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Analyzing | Self::Structuring | Self::Visualizing
        )
    }
}

/// Immutable capture of `(title, slides)` used as the history entry payload.
/// `PartialEq` provides the deep value equality snapshot dedupe relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSnapshot {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl DeckSnapshot {
    pub fn capture(deck: &Deck) -> Self {
        Self {
            title: deck.title.clone(),
            slides: deck.slides.clone(),
        }
    }

    /// Overwrite the live deck with this capture. Selection and status are
    /// managed by the caller.
    pub fn restore(&self, deck: &mut Deck) {
        deck.title = self.title.clone();
        deck.slides = self.slides.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(id: &str) -> Slide {
        Slide {
            id: id.to_string(),
            layout: SlideLayout::Center,
            title: format!("Slide {id}"),
            subtitle: None,
            bullets: vec!["point".to_string()],
            image_prompt: "a prompt".to_string(),
            media_kind: MediaKind::None,
            media_url: None,
            generating: false,
            notes: None,
        }
    }

    #[test]
    fn layout_wire_names_roundtrip() {
        let json = serde_json::to_string(&SlideLayout::SplitLeft).unwrap();
        assert_eq!(json, "\"split-left\"");
        let back: SlideLayout = serde_json::from_str("\"image-heavy\"").unwrap();
        assert_eq!(back, SlideLayout::ImageHeavy);
    }

    #[test]
    fn unknown_layout_falls_back_to_center() {
        assert_eq!(SlideLayout::from_wire("two-column"), SlideLayout::Center);
        assert_eq!(SlideLayout::from_wire("title"), SlideLayout::Title);
    }

    #[test]
    fn generating_flag_is_not_serialized() {
        let mut s = slide("a");
        s.generating = true;
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("generating"));
        let back: Slide = serde_json::from_str(&json).unwrap();
        assert!(!back.generating);
    }

    #[test]
    fn draft_becomes_slide_with_zeroed_media() {
        let draft = SlideDraft {
            layout: SlideLayout::Title,
            title: "Intro".to_string(),
            subtitle: Some("sub".to_string()),
            bullets: vec!["a".to_string(), "b".to_string()],
            image_prompt: "sunrise".to_string(),
            notes: None,
        };
        let s = Slide::from_draft("id-1".to_string(), draft);
        assert_eq!(s.id, "id-1");
        assert_eq!(s.media_kind, MediaKind::None);
        assert!(s.media_url.is_none());
        assert!(!s.generating);
        assert!(s.media_consistent());
    }

    #[test]
    fn snapshot_capture_and_restore() {
        let deck = Deck::new("Talk", vec![slide("a"), slide("b")]);
        let snap = DeckSnapshot::capture(&deck);

        let mut other = Deck::new("Other", vec![slide("x")]);
        snap.restore(&mut other);
        assert_eq!(other, deck);
    }

    #[test]
    fn snapshot_equality_is_deep() {
        let deck = Deck::new("Talk", vec![slide("a")]);
        let snap = DeckSnapshot::capture(&deck);
        let mut deck2 = deck.clone();
        assert_eq!(snap, DeckSnapshot::capture(&deck2));

        deck2.slides[0].bullets.push("extra".to_string());
        assert_ne!(snap, DeckSnapshot::capture(&deck2));
    }

    #[test]
    fn deck_lookup_helpers() {
        let deck = Deck::new("Talk", vec![slide("a"), slide("b")]);
        assert_eq!(deck.position("b"), Some(1));
        assert!(deck.slide("a").is_some());
        assert!(deck.slide("missing").is_none());
    }

    #[test]
    fn busy_states() {
        assert!(GenerationStatus::Analyzing.is_busy());
        assert!(GenerationStatus::Visualizing.is_busy());
        assert!(!GenerationStatus::Idle.is_busy());
        assert!(!GenerationStatus::Complete.is_busy());
        assert!(!GenerationStatus::Error.is_busy());
    }
}
