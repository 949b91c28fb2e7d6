use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub video_model: Option<String>,
    pub project_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("DECKGEN_TEXT_MODEL") {
            config.text_model = Some(model);
        }

        if let Ok(model) = std::env::var("DECKGEN_IMAGE_MODEL") {
            config.image_model = Some(model);
        }

        if let Ok(model) = std::env::var("DECKGEN_VIDEO_MODEL") {
            config.video_model = Some(model);
        }

        if let Ok(path) = std::env::var("DECKGEN_PROJECT_PATH") {
            config.project_path = Some(PathBuf::from(path));
        }

        config
    }
}
