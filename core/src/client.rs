use anyhow::Result;
use async_trait::async_trait;
use deckgen_common::SlideDraft;
use deckgen_gemini::GeminiClient;

/// The external generation service as the editor sees it. Four async,
/// fallible operations; `Err` is a full failure the caller must surface,
/// `Ok(None)` from the media calls is an empty success (the model declined).
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Structure a topic plus free-form notes into 5-8 slide drafts. The
    /// first draft arrives with the title layout and the last with the
    /// conclusion layout; identity is assigned by the editor, never here.
    async fn structure_from_notes(&self, topic: &str, notes: &str) -> Result<Vec<SlideDraft>>;

    /// Best-effort prompt enhancement; callers fall back to the original
    /// prompt on failure.
    async fn refine_prompt(&self, prompt: &str, slide_title: &str) -> Result<String>;

    async fn image_from_prompt(&self, prompt: &str) -> Result<Option<String>>;

    async fn video_from_prompt(&self, prompt: &str) -> Result<Option<String>>;
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn structure_from_notes(&self, topic: &str, notes: &str) -> Result<Vec<SlideDraft>> {
        Ok(GeminiClient::structure_from_notes(self, topic, notes).await?)
    }

    async fn refine_prompt(&self, prompt: &str, slide_title: &str) -> Result<String> {
        Ok(GeminiClient::refine_prompt(self, prompt, slide_title).await?)
    }

    async fn image_from_prompt(&self, prompt: &str) -> Result<Option<String>> {
        Ok(GeminiClient::image_from_prompt(self, prompt).await?)
    }

    async fn video_from_prompt(&self, prompt: &str) -> Result<Option<String>> {
        Ok(GeminiClient::video_from_prompt(self, prompt).await?)
    }
}
