//! Pull embedded subtitles out into side files and remux the videos without them.

use std::{
    path::{Path, PathBuf},
    process::Command,
    time::{Duration, Instant},
};

use anyhow::Context;
use app_config::SubtitlesConfig;
use app_helpers::{
    dirs,
    ffprobe::{self, Stream},
    fs::{file_name_lossy, move_into},
    process,
    progress::items_bar,
};
use app_logger::{debug, warn};

use crate::convert::BACKUP_DIR_NAME;

/// Side-file extension for a subtitle codec.
#[must_use]
pub fn subtitle_extension(codec: &str) -> String {
    let ext = match codec {
        "subrip" | "srt" | "mov_text" => ".srt".to_string(),
        "ass" | "ssa" => ".ass".to_string(),
        "webvtt" => ".vtt".to_string(),
        "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvdsub" | "pgs" => ".sup".to_string(),
        "" => ".sub".to_string(),
        other => format!(".{other}"),
    };

    ext.replace('/', "_")
}

/// Codecs ffmpeg can turn into SRT.
#[must_use]
pub fn is_text_codec(codec: &str) -> bool {
    matches!(
        codec,
        "subrip" | "srt" | "ass" | "ssa" | "webvtt" | "mov_text" | "vtt"
    )
}

/// `<stem>.s<index>[.<lang>]<ext>`
#[must_use]
pub fn subtitle_file_name(video: &Path, index: u32, codec: &str, language: &str) -> String {
    let stem = video
        .file_stem()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lang = if language.is_empty() {
        String::new()
    } else {
        format!(".{language}")
    };

    format!("{stem}.s{index}{lang}{}", subtitle_extension(codec))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMethod {
    ConvertedToSrt,
    Copied,
    Raw,
}

#[derive(Debug)]
pub struct FileReport {
    pub name: String,
    pub result: Result<String, String>,
    pub elapsed: Option<Duration>,
}

#[derive(Debug)]
pub struct SubtitleExtractor<'a> {
    ffmpeg: &'a Path,
    ffprobe: &'a Path,
    settings: &'a SubtitlesConfig,
}

impl<'a> SubtitleExtractor<'a> {
    #[must_use]
    pub const fn new(ffmpeg: &'a Path, ffprobe: &'a Path, settings: &'a SubtitlesConfig) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            settings,
        }
    }

    #[must_use]
    pub fn backup_dir(&self) -> Option<PathBuf> {
        self.settings
            .backup_originals
            .then(|| self.settings.input_dir.join(BACKUP_DIR_NAME))
    }

    fn run_ffmpeg(&self, build: impl FnOnce(&mut Command)) -> anyhow::Result<()> {
        let mut cmd = Command::new(self.ffmpeg);
        cmd.arg("-hide_banner").arg("-y");
        build(&mut cmd);

        process::checked_output(&mut cmd).map(|_| ())
    }

    fn extract_stream(
        &self,
        video: &Path,
        stream: &Stream,
        out: &Path,
    ) -> anyhow::Result<ExtractMethod> {
        let map = format!("0:{}", stream.index);
        let extract = |codec: &str| {
            self.run_ffmpeg(|cmd| {
                cmd.arg("-i")
                    .arg(video)
                    .args(["-map", map.as_str()])
                    .args(["-c:s", codec])
                    .arg(out);
            })
        };

        if !is_text_codec(stream.codec()) {
            extract("copy").context("raw extract failed")?;
            return Ok(ExtractMethod::Raw);
        }

        match extract("srt") {
            Ok(()) => Ok(ExtractMethod::ConvertedToSrt),
            Err(e) => {
                debug!("Converting stream {} to srt failed: {e:?}", stream.index);
                extract("copy").context("ffmpeg extraction failed")?;
                Ok(ExtractMethod::Copied)
            }
        }
    }

    /// Copy everything but the subtitle streams. Returns where the video ended up.
    fn remux_without_subtitles(&self, input: &Path, output: &Path) -> anyhow::Result<PathBuf> {
        let remux = |out: &Path| {
            self.run_ffmpeg(|cmd| {
                cmd.arg("-i")
                    .arg(input)
                    .args(["-map", "0", "-map", "-0:s"])
                    .args(["-c", "copy"])
                    .arg(out);
            })
        };

        match remux(output) {
            Ok(()) => Ok(output.to_path_buf()),
            Err(e) => {
                let fallback = output.with_extension("no_subs.mkv");
                debug!("Remux into {output:?} failed ({e:?}), trying {fallback:?}");
                remux(&fallback).context("remux failed")?;
                Ok(fallback)
            }
        }
    }

    /// Extract every subtitle stream of `video`, then write it again without them.
    pub fn process_file(&self, video: &Path) -> anyhow::Result<String> {
        let probe = ffprobe::ffprobe(self.ffprobe, video)
            .with_context(|| format!("ffprobe failed for {}", file_name_lossy(video)))?;

        let streams = probe.subtitle_streams().collect::<Vec<_>>();
        if streams.is_empty() {
            return Ok("no embedded subtitles".to_string());
        }

        dirs::ensure_dir(&self.settings.output_dir)?;
        dirs::ensure_dir(&self.settings.subs_dir)?;

        for stream in &streams {
            let name = subtitle_file_name(video, stream.index, stream.codec(), stream.language());
            let out = self.settings.subs_dir.join(&name);

            let msg = match self.extract_stream(video, stream, &out) {
                Ok(ExtractMethod::ConvertedToSrt) => {
                    format!("extracted (converted to srt) as {name}")
                }
                Ok(ExtractMethod::Copied) => format!("extracted (copied) as {name}"),
                Ok(ExtractMethod::Raw) => format!("extracted raw subtitle stream as {name}"),
                Err(e) => {
                    warn!("Extracting stream {} of {video:?} failed: {e:?}", stream.index);
                    format!("{e:#}")
                }
            };

            println!(
                "   • stream idx={} codec={} lang={} -> {msg}",
                stream.index,
                stream.codec(),
                stream.language()
            );
        }

        let name = video
            .file_name()
            .with_context(|| format!("{video:?} has no file name"))?;
        let out_video = self.settings.output_dir.join(name);
        let written = self.remux_without_subtitles(video, &out_video)?;

        if let Some(backup_dir) = self.backup_dir() {
            let res = dirs::ensure_dir(&backup_dir).and_then(|()| move_into(video, &backup_dir));
            if let Err(e) = res {
                warn!("Failed to move original {video:?} to backup: {e:?}");
                println!("Warning: failed to move original to backup: {e}");
            }
        }

        let remux_msg = if written == out_video {
            "remuxed without subtitles".to_string()
        } else {
            format!("remuxed to {} (fallback)", file_name_lossy(&written))
        };

        Ok(format!("extracted {} subs, remux: {remux_msg}", streams.len()))
    }

    /// Process every file, collecting a report per file instead of stopping on errors.
    pub fn process_files(&self, files: &[PathBuf]) -> anyhow::Result<Vec<FileReport>> {
        if files.is_empty() {
            debug!("No files to extract subtitles from");
            return Ok(vec![]);
        }

        if let Some(backup_dir) = self.backup_dir() {
            dirs::ensure_dir(&backup_dir)?;
        }

        println!("Found {} files. Processing...", files.len());

        let overall = items_bar(files.len(), "Overall");
        let reports = files
            .iter()
            .map(|file| {
                let name = file_name_lossy(file);
                overall.set_prefix(name.clone());

                let start = Instant::now();
                let result = self.process_file(file).map_err(|e| format!("{e:#}"));
                overall.inc(1);

                FileReport {
                    name,
                    result,
                    elapsed: Some(start.elapsed()),
                }
            })
            .collect();
        overall.finish();

        Ok(reports)
    }
}
