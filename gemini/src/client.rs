use base64::Engine;
use deckgen_common::{SlideDraft, SlideLayout};
use serde::Deserialize;
use std::time::Duration;

/// Seconds between polls of a long-running video operation.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Attempts to fetch a rendered video asset before giving up.
pub const FETCH_RETRIES: u32 = 3;
/// Delay between asset-fetch attempts.
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(2);

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-generate-preview";

/// The structuring contract: the model must produce this many slides.
const MIN_DRAFTS: usize = 5;
const MAX_DRAFTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unusable response: {0}")]
    InvalidResponse(String),
}

/// Client for the four generation operations the editor depends on.
///
/// All calls are stateless request/response; the video path additionally
/// polls the returned operation until completion and fetches the rendered
/// asset with a small bounded retry loop. Both of those policies belong to
/// this client, not to callers.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    video_model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_text_model(mut self, model: String) -> Self {
        self.text_model = model;
        self
    }

    pub fn with_image_model(mut self, model: String) -> Self {
        self.image_model = model;
        self
    }

    pub fn with_video_model(mut self, model: String) -> Self {
        self.video_model = model;
        self
    }

    /// Ask the text model for a slide structure. Yields 5-8 drafts with the
    /// first coerced to the title layout and the last to conclusion; a count
    /// outside that range is an invalid response.
    pub async fn structure_from_notes(
        &self,
        topic: &str,
        notes: &str,
    ) -> Result<Vec<SlideDraft>, GeminiError> {
        let prompt = structure_prompt(topic, notes);
        tracing::debug!(model = %self.text_model, topic, "requesting slide structure");
        let text = self.generate_text(&prompt, true).await?;
        let drafts = parse_drafts(&text)?;
        tracing::info!(slides = drafts.len(), "slide structure received");
        Ok(drafts)
    }

    /// Best-effort prompt enhancement. Callers treat failure as non-fatal
    /// and fall back to the original prompt.
    pub async fn refine_prompt(
        &self,
        prompt: &str,
        slide_title: &str,
    ) -> Result<String, GeminiError> {
        let request = format!(
            "Rewrite the following image-generation prompt so it produces a \
             polished presentation visual for a slide titled \"{slide_title}\". \
             Add style, lighting and composition detail. Reply with the prompt \
             text only.\n\nPrompt: {prompt}"
        );
        let text = self.generate_text(&request, false).await?;
        let refined = text.trim();
        if refined.is_empty() {
            return Err(GeminiError::InvalidResponse(
                "refinement returned empty text".to_string(),
            ));
        }
        Ok(refined.to_string())
    }

    /// Generate one image, returned as a data-URL locator. `Ok(None)` means
    /// the model declined to produce anything usable.
    pub async fn image_from_prompt(
        &self,
        prompt: &str,
    ) -> Result<Option<String>, GeminiError> {
        let url = format!(
            "{}/models/{}:predict?key={}",
            self.base_url, self.image_model, self.api_key
        );
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 },
        });
        tracing::debug!(model = %self.image_model, "requesting image");
        let value = self.post_json(&url, &body).await?;

        let Some(prediction) = value
            .get("predictions")
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
        else {
            return Ok(None);
        };
        let Some(encoded) = prediction
            .get("bytesBase64Encoded")
            .and_then(|b| b.as_str())
        else {
            return Ok(None);
        };
        let mime = prediction
            .get("mimeType")
            .and_then(|m| m.as_str())
            .unwrap_or("image/png");
        Ok(Some(format!("data:{mime};base64,{encoded}")))
    }

    /// Generate one video clip. Starts a long-running operation, polls it to
    /// completion, then fetches the rendered asset with a bounded retry loop
    /// against "not yet available" responses. `Ok(None)` means the operation
    /// completed without producing a sample.
    pub async fn video_from_prompt(
        &self,
        prompt: &str,
    ) -> Result<Option<String>, GeminiError> {
        let url = format!(
            "{}/models/{}:predictLongRunning?key={}",
            self.base_url, self.video_model, self.api_key
        );
        let body = serde_json::json!({ "instances": [{ "prompt": prompt }] });
        tracing::debug!(model = %self.video_model, "starting video operation");
        let started = self.post_json(&url, &body).await?;
        let op_name = started
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| {
                GeminiError::InvalidResponse("operation start returned no name".to_string())
            })?
            .to_string();

        let done = self.poll_operation(&op_name).await?;
        let Some(uri) = video_uri(&done) else {
            tracing::info!(operation = %op_name, "video operation produced no sample");
            return Ok(None);
        };
        let bytes = self.fetch_asset(&uri).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Some(format!("data:video/mp4;base64,{encoded}")))
    }

    async fn generate_text(
        &self,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.text_model, self.api_key
        );
        let mut body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if json_mode {
            body["generationConfig"] = serde_json::json!({
                "responseMimeType": "application/json",
            });
        }
        let value = self.post_json(&url, &body).await?;
        candidate_text(&value).ok_or_else(|| {
            GeminiError::InvalidResponse("response carried no candidate text".to_string())
        })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GeminiError> {
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "gemini call failed");
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    /// Poll an operation until `done`. The interval is fixed; completion time
    /// is bounded by the service, not by us.
    async fn poll_operation(&self, op_name: &str) -> Result<serde_json::Value, GeminiError> {
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let url = format!("{}/{}?key={}", self.base_url, op_name, self.api_key);
            let resp = self.http.get(&url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(GeminiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            let value: serde_json::Value = resp.json().await?;
            if value.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
                return Ok(value);
            }
            tracing::debug!(operation = %op_name, "video operation still running");
        }
    }

    /// Fetch the rendered asset. Freshly completed operations can answer 404
    /// for a short window, so retry a fixed number of times with a fixed
    /// delay before treating it as a failure.
    async fn fetch_asset(&self, uri: &str) -> Result<Vec<u8>, GeminiError> {
        let url = format!("{uri}&key={}", self.api_key);
        let mut last_status = 0u16;
        for attempt in 1..=FETCH_RETRIES {
            let resp = self.http.get(&url).send().await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp.bytes().await?.to_vec());
            }
            last_status = status.as_u16();
            if status == reqwest::StatusCode::NOT_FOUND && attempt < FETCH_RETRIES {
                tracing::debug!(attempt, "asset not yet available, retrying");
                tokio::time::sleep(FETCH_RETRY_DELAY).await;
                continue;
            }
            break;
        }
        Err(GeminiError::Api {
            status: last_status,
            message: format!("asset fetch failed after {FETCH_RETRIES} attempts"),
        })
    }
}

fn structure_prompt(topic: &str, notes: &str) -> String {
    format!(
        "You are a presentation designer. Create a slide deck structure for \
         the topic below.\n\
         Topic: {topic}\n\
         Notes: {notes}\n\n\
         Reply with a JSON array of {MIN_DRAFTS} to {MAX_DRAFTS} slides. Each \
         element has: \"layout\" (one of \"title\", \"split-left\", \
         \"split-right\", \"center\", \"image-heavy\", \"data\", \
         \"conclusion\"), \"title\", optional \"subtitle\", \"content\" (array \
         of bullet strings), \"imagePrompt\" (a visual description for image \
         generation), optional \"notes\" (speaker notes). The first slide must \
         use the \"title\" layout and the last the \"conclusion\" layout."
    )
}

/// Draft as it appears on the wire. Field names follow the JSON the model
/// is instructed to emit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDraft {
    #[serde(default)]
    layout: String,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default, alias = "bullets")]
    content: Vec<String>,
    #[serde(default)]
    image_prompt: String,
    #[serde(default)]
    notes: Option<String>,
}

/// Parse the structuring response: strip any code fence, decode the draft
/// array, validate the count, coerce the first/last layouts.
fn parse_drafts(text: &str) -> Result<Vec<SlideDraft>, GeminiError> {
    let cleaned = strip_code_fences(text);
    let wire: Vec<WireDraft> = serde_json::from_str(cleaned)
        .map_err(|e| GeminiError::InvalidResponse(format!("bad structure JSON: {e}")))?;

    if wire.len() < MIN_DRAFTS || wire.len() > MAX_DRAFTS {
        return Err(GeminiError::InvalidResponse(format!(
            "expected {MIN_DRAFTS}-{MAX_DRAFTS} slides, got {}",
            wire.len()
        )));
    }

    let last = wire.len() - 1;
    Ok(wire
        .into_iter()
        .enumerate()
        .map(|(i, d)| SlideDraft {
            layout: if i == 0 {
                SlideLayout::Title
            } else if i == last {
                SlideLayout::Conclusion
            } else {
                SlideLayout::from_wire(&d.layout)
            },
            title: d.title,
            subtitle: d.subtitle,
            bullets: d.content,
            image_prompt: d.image_prompt,
            notes: d.notes,
        })
        .collect())
}

/// Models wrap JSON in markdown fences even when asked not to.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn candidate_text(value: &serde_json::Value) -> Option<String> {
    value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

fn video_uri(done: &serde_json::Value) -> Option<String> {
    done.get("response")?
        .get("generateVideoResponse")?
        .get("generatedSamples")?
        .as_array()?
        .first()?
        .get("video")?
        .get("uri")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_json(n: usize) -> String {
        let slides: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"layout":"center","title":"Slide {i}","content":["a","b"],"imagePrompt":"p{i}"}}"#
                )
            })
            .collect();
        format!("[{}]", slides.join(","))
    }

    #[test]
    fn parses_six_drafts_and_coerces_ends() {
        let drafts = parse_drafts(&draft_json(6)).unwrap();
        assert_eq!(drafts.len(), 6);
        assert_eq!(drafts[0].layout, SlideLayout::Title);
        assert_eq!(drafts[5].layout, SlideLayout::Conclusion);
        for d in &drafts[1..5] {
            assert_eq!(d.layout, SlideLayout::Center);
        }
        assert_eq!(drafts[2].bullets, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(drafts[2].image_prompt, "p2");
    }

    #[test]
    fn rejects_counts_outside_contract() {
        assert!(parse_drafts(&draft_json(4)).is_err());
        assert!(parse_drafts(&draft_json(9)).is_err());
        assert!(parse_drafts(&draft_json(5)).is_ok());
        assert!(parse_drafts(&draft_json(8)).is_ok());
    }

    #[test]
    fn unknown_layout_becomes_center() {
        let json = r#"[
            {"layout":"title","title":"a"},
            {"layout":"mosaic","title":"b"},
            {"layout":"data","title":"c"},
            {"layout":"split-left","title":"d"},
            {"layout":"conclusion","title":"e"}
        ]"#;
        let drafts = parse_drafts(json).unwrap();
        assert_eq!(drafts[1].layout, SlideLayout::Center);
        assert_eq!(drafts[2].layout, SlideLayout::Data);
        assert_eq!(drafts[3].layout, SlideLayout::SplitLeft);
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn fenced_payload_parses() {
        let fenced = format!("```json\n{}\n```", draft_json(5));
        assert_eq!(parse_drafts(&fenced).unwrap().len(), 5);
    }

    #[test]
    fn candidate_text_walks_response_shape() {
        let value = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }]
        });
        assert_eq!(candidate_text(&value).as_deref(), Some("hello"));
        assert!(candidate_text(&serde_json::json!({})).is_none());
    }

    #[test]
    fn video_uri_walks_operation_shape() {
        let done = serde_json::json!({
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://example.test/v.mp4?alt=media" } }
            ] } }
        });
        assert_eq!(
            video_uri(&done).as_deref(),
            Some("https://example.test/v.mp4?alt=media")
        );
        assert!(video_uri(&serde_json::json!({"done": true})).is_none());
    }
}
