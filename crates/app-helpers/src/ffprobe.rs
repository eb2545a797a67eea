//! Typed view of `ffprobe -show_streams -show_format -of json`.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context};
use app_logger::trace;
use serde::Deserialize;

use crate::process;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FfProbeResult {
    #[serde(default)]
    pub streams: Vec<Stream>,

    #[serde(default)]
    pub format: Format,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Stream {
    #[serde(default)]
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub profile: Option<String>,
    pub pix_fmt: Option<String>,
    pub level: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub tags: Option<Tags>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Tags {
    pub language: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub filename: PathBuf,
    #[serde(default)]
    pub format_name: String,
    /// ffprobe prints this as a string.
    pub duration: Option<String>,
}

impl Stream {
    fn is(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        self.is("video")
    }

    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.is("audio")
    }

    #[must_use]
    pub fn is_subtitle(&self) -> bool {
        self.is("subtitle")
    }

    #[must_use]
    pub fn codec(&self) -> &str {
        self.codec_name.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn language(&self) -> &str {
        self.tags
            .as_ref()
            .and_then(|t| t.language.as_deref())
            .unwrap_or_default()
    }

    /// The H.264 level as ffmpeg counts it, so 4.1 is `41`.
    ///
    /// Some containers report the dotted form, which gets scaled up. Unknown
    /// levels (ffprobe uses negative numbers for those) are `None`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn h264_level(&self) -> Option<u32> {
        let level = self.level?;

        if level <= 0.0 {
            return None;
        }

        if level < 10.0 {
            Some((level * 10.0).round() as u32)
        } else {
            Some(level as u32)
        }
    }
}

impl FfProbeResult {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse ffprobe output")
    }

    #[must_use]
    pub fn video_stream(&self) -> Option<&Stream> {
        self.streams.iter().find(|s| s.is_video())
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter().filter(|s| s.is_video())
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter().filter(|s| s.is_audio())
    }

    pub fn subtitle_streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter().filter(|s| s.is_subtitle())
    }

    #[must_use]
    pub fn has_subtitles(&self) -> bool {
        self.subtitle_streams().next().is_some()
    }

    #[must_use]
    pub fn has_aac_audio(&self) -> bool {
        self.audio_streams().any(|s| s.codec() == "aac")
    }

    /// `format_name` is a comma separated list, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    #[must_use]
    pub fn container_is_one_of(&self, containers: &[&str]) -> bool {
        containers
            .iter()
            .any(|c| self.format.format_name.contains(*c))
    }

    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        self.format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    }
}

pub fn ffprobe(ffprobe_path: &Path, file: &Path) -> anyhow::Result<FfProbeResult> {
    let mut cmd = Command::new(ffprobe_path);
    cmd.args(["-v", "error"])
        .arg("-show_streams")
        .arg("-show_format")
        .args(["-of", "json"])
        .arg(file);

    let output = process::output(&mut cmd)?;

    if !output.status.success() {
        bail!(
            "ffprobe failed on {file:?}: {}",
            process::excerpt(&output.stderr, 300)
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let res = FfProbeResult::parse(&stdout).with_context(|| format!("Probing {file:?}"))?;
    trace!("ffprobe of {file:?}: {res:?}");

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MKV_HEVC: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "hevc",
                "codec_type": "video",
                "profile": "Main 10",
                "width": 3840,
                "height": 2160,
                "pix_fmt": "yuv420p10le",
                "level": 153
            },
            {
                "index": 1,
                "codec_name": "opus",
                "codec_type": "audio",
                "tags": { "language": "eng" }
            },
            {
                "index": 2,
                "codec_name": "subrip",
                "codec_type": "subtitle",
                "tags": { "language": "ger", "title": "German" }
            }
        ],
        "format": {
            "filename": "vids/show.mkv",
            "format_name": "matroska,webm",
            "duration": "1325.480000"
        }
    }"#;

    #[test]
    fn parses_streams_and_format() {
        let probe = FfProbeResult::parse(MKV_HEVC).unwrap();

        assert_eq!(probe.streams.len(), 3);
        assert_eq!(probe.video_stream().map(Stream::codec), Some("hevc"));
        assert_eq!(probe.format.filename, PathBuf::from("vids/show.mkv"));
        assert_eq!(probe.duration_seconds(), Some(1325.48));
        assert!(probe.has_subtitles());
        assert!(!probe.has_aac_audio());
        assert!(probe.container_is_one_of(&["webm"]));
        assert!(!probe.container_is_one_of(&["mp4", "mov"]));
    }

    #[test]
    fn subtitle_language_comes_from_tags() {
        let probe = FfProbeResult::parse(MKV_HEVC).unwrap();
        let sub = probe.subtitle_streams().next().unwrap();

        assert_eq!(sub.index, 2);
        assert_eq!(sub.language(), "ger");
        assert_eq!(probe.video_stream().unwrap().language(), "");
    }

    #[test]
    fn h264_level_handles_both_notations() {
        let stream = |level| Stream {
            level,
            ..Stream::default()
        };

        assert_eq!(stream(Some(41.0)).h264_level(), Some(41));
        assert_eq!(stream(Some(4.1)).h264_level(), Some(41));
        assert_eq!(stream(Some(5.0)).h264_level(), Some(50));
        assert_eq!(stream(Some(-99.0)).h264_level(), None);
        assert_eq!(stream(None).h264_level(), None);
    }

    #[test]
    fn missing_sections_default() {
        let probe = FfProbeResult::parse("{}").unwrap();

        assert!(probe.streams.is_empty());
        assert!(probe.video_stream().is_none());
        assert_eq!(probe.duration_seconds(), None);
    }

    #[test]
    fn unusable_durations_are_unknown() {
        for duration in ["inf", "NaN", "0", "-3", "N/A"] {
            let probe =
                FfProbeResult::parse(&format!(r#"{{"format": {{"duration": "{duration}"}}}}"#))
                    .unwrap();

            assert_eq!(probe.duration_seconds(), None, "{duration}");
        }
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(FfProbeResult::parse("not json").is_err());
    }
}
