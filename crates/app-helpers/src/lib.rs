pub mod dirs;
pub mod ffprobe;
pub mod fs;
pub mod id;
pub mod process;
pub mod progress;
pub mod prompt;
pub mod trash;
