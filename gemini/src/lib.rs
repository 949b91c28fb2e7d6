//! HTTP client for the Gemini generation endpoints: slide structuring and
//! prompt refinement via text generation, image synthesis via Imagen-style
//! `:predict`, video synthesis via Veo-style long-running operations.

pub mod client;

pub use client::{GeminiClient, GeminiError};
