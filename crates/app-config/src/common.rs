use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{Args, ValueHint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
#[allow(clippy::struct_field_names)]
pub struct ProgramPathConfig {
    #[arg(long, global = true, default_value = None, env = "VIDSHELF_YT_DLP", value_hint = ValueHint::FilePath)]
    /// Path to the yt-dlp executable.
    ///
    /// If not provided, yt-dlp will be searched for in $PATH
    pub yt_dlp_path: Option<PathBuf>,

    #[arg(long, global = true, default_value = None, env = "VIDSHELF_FFMPEG", value_hint = ValueHint::FilePath)]
    /// Path to the ffmpeg executable.
    ///
    /// If not provided, ffmpeg will be searched for in $PATH
    pub ffmpeg_path: Option<PathBuf>,

    #[arg(long, global = true, default_value = None, env = "VIDSHELF_FFPROBE", value_hint = ValueHint::FilePath)]
    /// Path to the ffprobe executable.
    ///
    /// If not provided, ffprobe will be searched for in $PATH
    pub ffprobe_path: Option<PathBuf>,
}

impl ProgramPathConfig {
    pub(crate) fn merge(&mut self, config: &Self) -> &Self {
        if let Some(yt_dlp_path) = config.yt_dlp_path.as_ref() {
            self.yt_dlp_path = Some(yt_dlp_path.clone());
        }

        if let Some(ffmpeg_path) = config.ffmpeg_path.as_ref() {
            self.ffmpeg_path = Some(ffmpeg_path.clone());
        }

        if let Some(ffprobe_path) = config.ffprobe_path.as_ref() {
            self.ffprobe_path = Some(ffprobe_path.clone());
        }

        self
    }

    /// Fill in whatever is still unset from `$PATH`.
    pub(crate) fn search_path(&mut self) {
        if self.yt_dlp_path.is_none() {
            self.yt_dlp_path = which::which("yt-dlp").ok();
        }

        if self.ffmpeg_path.is_none() {
            self.ffmpeg_path = which::which("ffmpeg").ok();
        }

        if self.ffprobe_path.is_none() {
            self.ffprobe_path = which::which("ffprobe").ok();
        }
    }

    pub fn yt_dlp(&self) -> anyhow::Result<&Path> {
        require("yt-dlp", "yt_dlp_path", self.yt_dlp_path.as_deref())
    }

    pub fn ffmpeg(&self) -> anyhow::Result<&Path> {
        require("ffmpeg", "ffmpeg_path", self.ffmpeg_path.as_deref())
    }

    pub fn ffprobe(&self) -> anyhow::Result<&Path> {
        require("ffprobe", "ffprobe_path", self.ffprobe_path.as_deref())
    }
}

fn require<'a>(program: &str, key: &str, path: Option<&'a Path>) -> anyhow::Result<&'a Path> {
    path.ok_or_else(|| {
        anyhow!(
            "`{program}' was not found in $PATH. Install it or set `dependencies.{key}' in the \
             config file"
        )
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
pub struct FolderConfig {
    #[arg(long, global = true, default_value = None, env = "VIDSHELF_VIDEOS_DIR", value_hint = ValueHint::DirPath)]
    /// The library folder downloaded videos end up in.
    ///
    /// Defaults to `./videos'
    pub videos_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = None, env = "VIDSHELF_DOWNLOAD_TEMP_DIR", value_hint = ValueHint::DirPath)]
    /// Scratch folder yt-dlp downloads into before files are moved into the library.
    ///
    /// Defaults to `./download_temp'
    pub download_temp_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = None, env = "VIDSHELF_CONVERT_TEMP_DIR", value_hint = ValueHint::DirPath)]
    /// Scratch folder for converted downloads.
    ///
    /// Defaults to `./converted_videos'
    pub convert_temp_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = None, env = "VIDSHELF_LINKS_FILE", value_hint = ValueHint::FilePath)]
    /// JSON file holding saved links.
    ///
    /// Defaults to `./yt_links.json'
    pub links_file: Option<PathBuf>,
}

impl FolderConfig {
    pub(crate) fn merge(&mut self, config: &Self) -> &Self {
        if let Some(videos_dir) = config.videos_dir.as_ref() {
            self.videos_dir = Some(videos_dir.clone());
        }

        if let Some(download_temp_dir) = config.download_temp_dir.as_ref() {
            self.download_temp_dir = Some(download_temp_dir.clone());
        }

        if let Some(convert_temp_dir) = config.convert_temp_dir.as_ref() {
            self.convert_temp_dir = Some(convert_temp_dir.clone());
        }

        if let Some(links_file) = config.links_file.as_ref() {
            self.links_file = Some(links_file.clone());
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_overrides_set_paths() {
        let mut base = ProgramPathConfig {
            yt_dlp_path: Some("/usr/bin/yt-dlp".into()),
            ffmpeg_path: Some("/usr/bin/ffmpeg".into()),
            ffprobe_path: None,
        };
        let other = ProgramPathConfig {
            yt_dlp_path: None,
            ffmpeg_path: Some("/opt/ffmpeg/bin/ffmpeg".into()),
            ffprobe_path: Some("/opt/ffmpeg/bin/ffprobe".into()),
        };

        base.merge(&other);

        assert_eq!(base.yt_dlp_path, Some("/usr/bin/yt-dlp".into()));
        assert_eq!(base.ffmpeg_path, Some("/opt/ffmpeg/bin/ffmpeg".into()));
        assert_eq!(base.ffprobe_path, Some("/opt/ffmpeg/bin/ffprobe".into()));
    }

    #[test]
    fn missing_program_names_the_config_key() {
        let paths = ProgramPathConfig::default();

        let err = paths.ffprobe().unwrap_err().to_string();
        assert!(err.contains("ffprobe"));
        assert!(err.contains("dependencies.ffprobe_path"));
    }
}
