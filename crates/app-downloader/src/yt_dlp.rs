use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context};
use app_helpers::process;
use app_logger::{debug, info, trace};
use serde::Deserialize;
use url::Url;

/// Output template used for every download, relative to the target folder.
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
const MERGE_FORMAT: &str = "mp4";
/// What the size estimate asks for. Everything else uses the configured selector.
const SIZE_FORMAT: &str = "bestvideo+bestaudio";

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistEntry {
    pub id: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

impl PlaylistEntry {
    /// `webpage_url`, then `url`, then a watch URL built from the id.
    #[must_use]
    pub fn video_url(&self) -> Option<String> {
        if let Some(url) = self.webpage_url.as_ref().or(self.url.as_ref()) {
            return Some(url.clone());
        }

        let id = self.id.as_deref()?;
        Url::parse_with_params("https://www.youtube.com/watch", [("v", id)])
            .ok()
            .map(String::from)
    }

    /// yt-dlp lists thumbnails smallest first.
    #[must_use]
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnails.last().map(|t| t.url.as_str())
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Playlist {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse yt-dlp playlist output")
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct SizeInfo {
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_size(json: &str) -> anyhow::Result<u64> {
    let info: SizeInfo =
        serde_json::from_str(json).context("Failed to parse yt-dlp video info")?;

    Ok(info
        .filesize
        .or(info.filesize_approx)
        .map_or(0, |size| size.max(0.0) as u64))
}

#[derive(Debug, Clone)]
pub struct YtDlp<'a> {
    path: &'a Path,
    concurrent_fragments: u32,
}

impl<'a> YtDlp<'a> {
    #[must_use]
    pub const fn new(path: &'a Path, concurrent_fragments: u32) -> Self {
        Self {
            path,
            concurrent_fragments,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.path);
        cmd.arg("--no-warnings").arg("--no-playlist");
        cmd
    }

    fn stdout(cmd: &mut Command) -> anyhow::Result<String> {
        let output = process::checked_output(cmd)?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Resolve a playlist without resolving every video in it.
    pub fn playlist(&self, url: &str) -> anyhow::Result<Playlist> {
        info!("Fetching playlist {url:?}");

        let mut cmd = Command::new(self.path);
        cmd.arg("--no-warnings")
            .arg("--flat-playlist")
            .arg("--dump-single-json")
            .arg(url);

        let json = Self::stdout(&mut cmd)?;
        let playlist = Playlist::parse(&json)?;
        debug!(
            "Playlist {:?} has {} entries",
            playlist.title(),
            playlist.entries.len()
        );

        Ok(playlist)
    }

    fn output_template(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_TEMPLATE)
    }

    /// The file name a download of `url` with `format` into `dir` would get.
    pub fn final_filename(&self, url: &str, format: &str, dir: &Path) -> anyhow::Result<String> {
        let mut cmd = self.command();
        cmd.args(["--format", format])
            .args(["--merge-output-format", MERGE_FORMAT])
            .arg("--output")
            .arg(Self::output_template(dir))
            .arg("--skip-download")
            .args(["--print", "filename"])
            .arg(url);

        let stdout = Self::stdout(&mut cmd)?;
        let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
            bail!("yt-dlp printed no file name for {url:?}");
        };
        trace!("yt-dlp file name for {url:?}: {line:?}");

        let name = Path::new(line)
            .file_name()
            .with_context(|| format!("yt-dlp printed an odd file name: {line:?}"))?;

        Ok(name.to_string_lossy().into_owned())
    }

    /// Estimated download size in bytes, 0 when yt-dlp doesn't know.
    pub fn size(&self, url: &str) -> anyhow::Result<u64> {
        let mut cmd = self.command();
        cmd.args(["--format", SIZE_FORMAT])
            .arg("--skip-download")
            .arg("--dump-json")
            .arg(url);

        parse_size(&Self::stdout(&mut cmd)?)
    }

    /// Download into `dir` with regular and automatic subtitles as SRT side files.
    pub fn download_with_subtitles(
        &self,
        url: &str,
        format: &str,
        dir: &Path,
    ) -> anyhow::Result<()> {
        info!("Downloading {url:?} into {dir:?}");

        let mut cmd = self.command();
        cmd.args(["--format", format])
            .args(["--merge-output-format", MERGE_FORMAT])
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .args(["--sub-format", "srt/best"])
            .args(["--convert-subs", "srt"])
            .arg("--concurrent-fragments")
            .arg(self.concurrent_fragments.to_string())
            .arg("--output")
            .arg(Self::output_template(dir))
            .arg(url);

        process::checked_output(&mut cmd)
            .with_context(|| format!("yt-dlp failed to download {url:?}"))?;

        Ok(())
    }
}
