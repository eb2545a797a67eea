//! Media tasks built on top of `ffprobe` and `ffmpeg`.

pub mod artwork;
pub mod command;
pub mod compat;
pub mod convert;
pub mod encoder;
pub mod interrupt;
pub mod progress;
pub mod subtitles;
mod util;
