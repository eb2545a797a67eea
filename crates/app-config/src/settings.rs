//! Per-task settings.
//!
//! Every struct is `#[serde(default)]` so a config file only needs the keys it
//! wants to change. The defaults are the values the tasks have always used.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn extensions(list: &[&str]) -> Vec<String> {
    list.iter().map(|x| (*x).to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Folder scanned when `check` is run without an argument.
    pub folder: PathBuf,
    pub extensions: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            folder: "vids".into(),
            extensions: extensions(&[".mp4", ".mkv", ".webm"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Move converted originals into `<input_dir>/originals_backup` instead of deleting them.
    pub backup_originals: bool,
    pub use_hardware_encoder: bool,
    /// Sources larger than this get scaled down, never up.
    pub max_width: u32,
    pub max_height: u32,
    /// libx264 CRF. Lower is better quality and bigger files.
    pub crf: u8,
    /// Bitrate ceiling for the hardware encoders.
    pub hw_maxrate: String,
    pub hw_bufsize: String,
    pub audio_bitrate: String,
    pub extensions: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_dir: "videos".into(),
            output_dir: "converted_videos".into(),
            backup_originals: false,
            use_hardware_encoder: true,
            max_width: 1920 * 2,
            max_height: 1080 * 2,
            crf: 18,
            hw_maxrate: "12M".into(),
            hw_bufsize: "24M".into(),
            audio_bitrate: "128k".into(),
            extensions: extensions(&[".mp4", ".mkv", ".mov", ".avi", ".m4v", ".webm"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Passed to yt-dlp as `--concurrent-fragments`.
    pub concurrent_fragments: u32,
    /// Sum up the size of everything before downloading.
    pub size_check: bool,
    /// Wait for enter before the downloads start.
    pub ask_before_download: bool,
    pub video_extensions: Vec<String>,
    pub subtitle_extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrent_fragments: 5,
            size_check: false,
            ask_before_download: false,
            video_extensions: extensions(&[".mp4", ".mkv", ".mov", ".avi", ".m4v", ".webm"]),
            subtitle_extensions: extensions(&[".srt", ".vtt", ".ass"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    pub convert_videos: bool,
    /// yt-dlp format selector.
    pub format: String,
    /// Season folder inside the videos folder.
    pub season_folder: String,
    pub season: u32,
    pub poster_count: usize,
    pub fanart_count: usize,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            convert_videos: true,
            format: "bv*+ba/b".into(),
            season_folder: "Season 01".into(),
            season: 1,
            poster_count: 5,
            fanart_count: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkListConfig {
    pub convert_videos: bool,
    pub format: String,
}

impl Default for LinkListConfig {
    fn default() -> Self {
        Self {
            convert_videos: false,
            format: "(bv*[height<=1080]+ba/b)[ext=mp4]/b".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotkeyModifier {
    Meta,
    Ctrl,
    Alt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub hotkey_modifier: HotkeyModifier,
    /// Letter pressed together with the modifier.
    pub hotkey_key: char,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            hotkey_modifier: HotkeyModifier::Meta,
            hotkey_key: 'b',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitlesConfig {
    pub input_dir: PathBuf,
    /// Where the videos without subtitle streams go.
    pub output_dir: PathBuf,
    pub subs_dir: PathBuf,
    pub backup_originals: bool,
    pub extensions: Vec<String>,
}

impl Default for SubtitlesConfig {
    fn default() -> Self {
        Self {
            input_dir: "vids".into(),
            output_dir: "video_no_subs".into(),
            subs_dir: "extracted_subs".into(),
            backup_originals: true,
            extensions: extensions(&[".mp4", ".mkv", ".mov", ".avi", ".m4v", ".ts", ".webm"]),
        }
    }
}
