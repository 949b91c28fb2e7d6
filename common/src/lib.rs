//! Shared data model for the deckgen workspace.

pub mod types;

pub use types::{
    Deck, DeckSnapshot, GenerationStatus, MediaKind, Slide, SlideDraft, SlideLayout,
};
