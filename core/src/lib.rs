//! Editor core: deck state, bounded undo/redo history, the media-generation
//! workflow, and the single-blob project store. The rendering shell sits on
//! top of [`editor::DeckEditor`] and subscribes to its event stream.

pub mod client;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod history;
pub mod storage;

pub use client::GenerationClient;
pub use config::Config;
pub use editor::{DeckEditor, MoveDirection};
pub use error::{EditorError, Result};
pub use events::{EditorEvent, NoticeLevel};
pub use history::{HistoryLog, HISTORY_LIMIT};
pub use storage::{JsonFileStore, MemoryStore, ProjectStore, SavedProject};
