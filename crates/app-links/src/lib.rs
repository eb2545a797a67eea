//! The saved link list and the clipboard hotkey that fills it.

#[cfg(feature = "hotkey")]
pub mod hotkey;
pub mod store;

pub use store::{is_video_link, AddOutcome, LinkStore, SaveOutcome};
