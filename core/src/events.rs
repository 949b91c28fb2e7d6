use deckgen_common::GenerationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// What the editor tells the shell. Notices are the user-visible failure
/// surface; everything else is a redraw hint.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    StatusChanged(GenerationStatus),
    OutlineReady { slide_count: usize },
    MediaReady { slide_id: String },
    Notice { level: NoticeLevel, message: String },
}
