//! Batch conversion into direct-play MP4s.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::atomic::AtomicBool,
    time::Instant,
};

use anyhow::{bail, Context};
use app_config::ConverterConfig;
use app_helpers::{
    dirs,
    ffprobe::{self, FfProbeResult},
    fs::{file_name_lossy, list_files, list_files_with_extensions, move_file, move_into},
    process,
    progress::{items_bar, percent_bar},
    trash,
};
use app_logger::{debug, info, trace, warn};
use scopeguard::ScopeGuard;

use crate::{
    command::{self, EncodeOptions},
    compat::{self, Report, TargetProfile},
    encoder::Encoder,
    interrupt::{self, Interrupted},
    progress::run_with_progress,
    util::copy_file_times,
};

pub const BACKUP_DIR_NAME: &str = "originals_backup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Skip,
    Remux,
    Encode { scale: bool, copy_audio: bool },
}

/// Decide what to do with a file from its probe. An unreadable file gets encoded.
#[must_use]
pub fn plan(probe: Option<&FfProbeResult>, target: &TargetProfile) -> Plan {
    let Some(probe) = probe else {
        return Plan::Encode {
            scale: false,
            copy_audio: false,
        };
    };

    let report = compat::analyze(probe, target);
    if report.passed {
        return Plan::Skip;
    }
    if report.only_container_issues() {
        return Plan::Remux;
    }

    let scale = match (probe.video_stream(), target.max_resolution) {
        (Some(video), Some((max_width, max_height))) => {
            video.width.unwrap_or_default() > max_width
                || video.height.unwrap_or_default() > max_height
        }
        _ => false,
    };

    Plan::Encode {
        scale,
        copy_audio: probe.has_aac_audio(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AlreadyCompatible,
    Remuxed,
    Encoded,
    SoftwareEncoded,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCompatible => write!(f, "already compatible - skipped"),
            Self::Remuxed => write!(f, "remuxed to mp4"),
            Self::Encoded => write!(f, "encoded and compatible"),
            Self::SoftwareEncoded => write!(f, "software encoded (CRF) and compatible"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done. ✅ {}  ❌ {}  ⏭️ {}",
            self.converted,
            self.failed.len(),
            self.skipped
        )
    }
}

#[derive(Debug)]
pub struct Converter<'a> {
    ffmpeg: &'a Path,
    ffprobe: &'a Path,
    encoder: Encoder,
    settings: &'a ConverterConfig,
    target: TargetProfile,
    stop: &'a AtomicBool,
}

impl<'a> Converter<'a> {
    /// Picks the encoder by asking `ffmpeg`.
    #[must_use]
    pub fn new(ffmpeg: &'a Path, ffprobe: &'a Path, settings: &'a ConverterConfig) -> Self {
        let encoder = Encoder::detect(ffmpeg, settings.use_hardware_encoder);

        Self::with_encoder(ffmpeg, ffprobe, settings, encoder)
    }

    #[must_use]
    pub fn with_encoder(
        ffmpeg: &'a Path,
        ffprobe: &'a Path,
        settings: &'a ConverterConfig,
        encoder: Encoder,
    ) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            encoder,
            settings,
            target: TargetProfile::conversion(settings.max_width, settings.max_height),
            stop: interrupt::flag(),
        }
    }

    /// Watch `stop` instead of the process wide Ctrl+C flag.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub const fn encoder(&self) -> Encoder {
        self.encoder
    }

    fn probe(&self, file: &Path) -> Option<FfProbeResult> {
        match ffprobe::ffprobe(self.ffprobe, file) {
            Ok(probe) => Some(probe),
            Err(e) => {
                warn!("Failed to probe {file:?}: {e:?}");
                None
            }
        }
    }

    fn verify(&self, file: &Path) -> Report {
        compat::check_file(self.ffprobe, file, &self.target)
    }

    fn encode(
        &self,
        input: &Path,
        output: &Path,
        encoder: Encoder,
        options: &EncodeOptions,
        duration: Option<f64>,
    ) -> anyhow::Result<Report> {
        let label = match encoder {
            Encoder::Software if self.encoder.is_hardware() => "SW encode",
            _ => "Encode",
        };
        let bar = percent_bar(&format!("{label} {}", file_name_lossy(input)));

        let mut cmd = command::encode(self.ffmpeg, input, output, encoder, options);
        let run = run_with_progress(&mut cmd, duration, &bar, self.stop)?;
        bar.finish_and_clear();

        if !run.success() {
            bail!(
                "{encoder:?} encode failed ({}): {}",
                run.status,
                process::excerpt(run.stderr.as_bytes(), 200)
            );
        }

        Ok(self.verify(output))
    }

    fn remux(&self, input: &Path, output: &Path, duration: Option<f64>) -> anyhow::Result<bool> {
        let bar = percent_bar(&format!("Remux {}", file_name_lossy(input)));

        let mut cmd = command::remux(self.ffmpeg, input, output);
        let run = run_with_progress(&mut cmd, duration, &bar, self.stop)?;
        bar.finish_and_clear();

        if !run.success() {
            debug!(
                "Remux of {input:?} failed: {}",
                process::excerpt(run.stderr.as_bytes(), 200)
            );
        }

        Ok(run.success())
    }

    /// Convert a single file into `output`.
    ///
    /// Whatever was written to `output` or the software fallback path is
    /// removed again when this returns an error, including [`Interrupted`].
    pub fn convert_file(&self, input: &Path, output: &Path) -> anyhow::Result<Outcome> {
        let probe = self.probe(input);
        let plan = plan(probe.as_ref(), &self.target);
        debug!("Plan for {input:?}: {plan:?}");

        let software_tmp = output.with_extension("sw.tmp.mp4");
        let cleanup = scopeguard::guard((), |()| {
            for partial in [output, software_tmp.as_path()] {
                if partial.exists() {
                    trace!("Removing partial output {partial:?}");
                    let _ = fs::remove_file(partial);
                }
            }
        });

        let duration = probe.as_ref().and_then(FfProbeResult::duration_seconds);
        let transfer_times = |to: &Path| copy_file_times(input, to);

        let (scale, copy_audio) = match plan {
            Plan::Skip => {
                ScopeGuard::into_inner(cleanup);
                return Ok(Outcome::AlreadyCompatible);
            }
            Plan::Remux => {
                if self.remux(input, output, duration)? {
                    ScopeGuard::into_inner(cleanup);
                    transfer_times(output);
                    return Ok(Outcome::Remuxed);
                }
                let has_aac = probe.as_ref().is_some_and(FfProbeResult::has_aac_audio);
                (false, has_aac)
            }
            Plan::Encode { scale, copy_audio } => (scale, copy_audio),
        };

        if probe.as_ref().is_some_and(FfProbeResult::has_subtitles) {
            warn!("{input:?} has embedded subtitles, they are left out of the converted file");
        }

        let options = EncodeOptions {
            scale,
            copy_audio,
            ..EncodeOptions::from_config(self.settings)
        };

        let first_attempt = self.encode(input, output, self.encoder, &options, duration);
        match first_attempt {
            Ok(report) if report.passed => {
                ScopeGuard::into_inner(cleanup);
                transfer_times(output);
                return Ok(Outcome::Encoded);
            }
            Ok(report) => {
                warn!(
                    "Output of {:?} is not compatible: {}",
                    self.encoder,
                    join_issues(&report)
                );
            }
            Err(e) if e.is::<Interrupted>() => return Err(e),
            Err(e) => warn!("{e:#}"),
        }

        if !self.encoder.is_hardware() {
            bail!("Software encoding did not produce a compatible file");
        }

        info!("Falling back to software encoding for {input:?}");
        let report = self
            .encode(input, &software_tmp, Encoder::Software, &options, duration)
            .context("Both hardware and software encoding failed")?;

        if !report.passed {
            bail!(
                "Software encoded but not compatible: {}",
                join_issues(&report)
            );
        }

        if output.exists() {
            fs::remove_file(output).with_context(|| format!("Failed to remove {output:?}"))?;
        }
        fs::rename(&software_tmp, output)
            .with_context(|| format!("Failed to rename {software_tmp:?} to {output:?}"))?;

        ScopeGuard::into_inner(cleanup);
        transfer_times(output);

        Ok(Outcome::SoftwareEncoded)
    }

    fn dispose_original(&self, file: &Path, backup_dir: Option<&Path>) {
        let res = match backup_dir {
            Some(dir) => move_into(file, dir).map(|_| ()),
            None => trash::discard(file),
        };

        if let Err(e) = res {
            warn!("Could not remove original {file:?}: {e:?}");
            println!("⚠️ Could not remove original {}: {e}", file_name_lossy(file));
        }
    }

    /// Convert every video in `input_dir` into `output_dir`.
    ///
    /// Files that are already compatible stay in `input_dir`.
    pub fn convert_folder(&self, input_dir: &Path, output_dir: &Path) -> anyhow::Result<Summary> {
        if !input_dir.is_dir() {
            bail!("Input folder {input_dir:?} not found");
        }
        dirs::ensure_dir(output_dir)?;

        let files = list_files_with_extensions(input_dir, &self.settings.extensions)?;
        let mut summary = Summary {
            total: files.len(),
            ..Summary::default()
        };
        if files.is_empty() {
            info!("No video files found in {input_dir:?}");
            return Ok(summary);
        }

        println!("{}", "=".repeat(60));
        println!("Converting {} file(s)", files.len());
        println!("Input: {} -> Output: {}", input_dir.display(), output_dir.display());
        println!("Encoder: {}", self.encoder);
        println!(
            "Software CRF (libx264): {}   HW maxrate (ceiling): {}",
            self.settings.crf, self.settings.hw_maxrate
        );
        println!("{}", "=".repeat(60));

        let backup_dir = if self.settings.backup_originals {
            let dir = input_dir.join(BACKUP_DIR_NAME);
            dirs::ensure_dir(&dir)?;
            Some(dir)
        } else {
            None
        };

        let overall = items_bar(files.len(), "Overall");
        for file in &files {
            if interrupt::is_interrupted(self.stop) {
                overall.abandon();
                return Err(Interrupted.into());
            }

            let name = file_name_lossy(file);
            let out_file = output_dir.join(file.with_extension("mp4").file_name().unwrap_or_default());
            let start = Instant::now();

            match self.convert_file(file, &out_file) {
                Ok(Outcome::AlreadyCompatible) => {
                    summary.skipped += 1;
                    overall.set_prefix(format!("Skipped (already compatible): {name}"));
                }
                Ok(outcome) => {
                    summary.converted += 1;
                    overall.set_prefix(format!(
                        "✅ {name} | {outcome} | {}s",
                        start.elapsed().as_secs()
                    ));
                    self.dispose_original(file, backup_dir.as_deref());
                }
                Err(e) if e.is::<Interrupted>() => {
                    overall.abandon();
                    println!("⏹ Stopped while converting {name}, partial output removed");
                    return Err(e);
                }
                Err(e) => {
                    warn!("Converting {file:?} failed: {e:?}");
                    overall.set_prefix(format!("❌ {name} | {e}"));
                    summary.failed.push((file.clone(), format!("{e:#}")));
                }
            }

            overall.inc(1);
        }
        overall.finish();

        println!();
        println!("{}", "=".repeat(60));
        println!("{summary}");
        println!("{}", "=".repeat(60));

        Ok(summary)
    }

    /// [`Self::convert_folder`], then carry every file left in `input_dir`
    /// over to `output_dir`.
    pub fn convert_and_collect(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> anyhow::Result<Summary> {
        let summary = self.convert_folder(input_dir, output_dir)?;
        move_leftovers(input_dir, output_dir)?;

        Ok(summary)
    }
}

fn join_issues(report: &Report) -> String {
    report
        .issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Move the regular files of `from` into `to`. Returns the new paths.
pub fn move_leftovers(from: &Path, to: &Path) -> anyhow::Result<Vec<PathBuf>> {
    dirs::ensure_dir(to)?;

    list_files(from)?
        .into_iter()
        .map(|file| {
            let dst = to.join(file.file_name().unwrap_or_default());
            move_file(&file, &dst).map(|()| dst)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(json: &str) -> FfProbeResult {
        FfProbeResult::parse(json).unwrap()
    }

    fn target() -> TargetProfile {
        TargetProfile::conversion(3840, 2160)
    }

    #[test]
    fn compatible_files_are_skipped() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "h264", "profile": "High",
                             "pix_fmt": "yuv420p", "level": 40, "width": 1920, "height": 1080},
                            {"codec_type": "audio", "codec_name": "aac"}],
                "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2"}}"#,
        );

        assert_eq!(plan(Some(&p), &target()), Plan::Skip);
    }

    #[test]
    fn wrong_container_only_is_remuxed() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "h264", "profile": "High",
                             "pix_fmt": "yuv420p", "level": 40, "width": 1920, "height": 1080},
                            {"codec_type": "audio", "codec_name": "aac"}],
                "format": {"format_name": "matroska,webm"}}"#,
        );

        assert_eq!(plan(Some(&p), &target()), Plan::Remux);
    }

    #[test]
    fn oversized_vp9_is_scaled_and_audio_reencoded() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "vp9",
                             "width": 7680, "height": 4320},
                            {"codec_type": "audio", "codec_name": "opus"}],
                "format": {"format_name": "matroska,webm"}}"#,
        );

        assert_eq!(
            plan(Some(&p), &target()),
            Plan::Encode {
                scale: true,
                copy_audio: false
            }
        );
    }

    #[test]
    fn aac_audio_is_copied() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "hevc",
                             "width": 1920, "height": 1080},
                            {"codec_type": "audio", "codec_name": "aac"}],
                "format": {"format_name": "matroska,webm"}}"#,
        );

        assert_eq!(
            plan(Some(&p), &target()),
            Plan::Encode {
                scale: false,
                copy_audio: true
            }
        );
    }

    #[test]
    fn unprobed_files_get_a_plain_encode() {
        assert_eq!(
            plan(None, &target()),
            Plan::Encode {
                scale: false,
                copy_audio: false
            }
        );
    }

    #[test]
    fn summary_line() {
        let summary = Summary {
            total: 4,
            converted: 2,
            skipped: 1,
            failed: vec![("x.mkv".into(), "nope".into())],
        };

        assert_eq!(summary.to_string(), "Done. ✅ 2  ❌ 1  ⏭️ 1");
    }

    #[test]
    fn leftovers_are_moved_but_folders_stay() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("in");
        let to = tmp.path().join("out");
        fs::create_dir_all(from.join(BACKUP_DIR_NAME)).unwrap();
        fs::write(from.join("a.mp4"), "a").unwrap();
        fs::write(from.join("a.en.srt"), "subs").unwrap();

        let moved = move_leftovers(&from, &to).unwrap();

        assert_eq!(moved.len(), 2);
        assert!(to.join("a.mp4").exists());
        assert!(to.join("a.en.srt").exists());
        assert!(from.join(BACKUP_DIR_NAME).is_dir());
    }

    #[test]
    fn missing_input_folder_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ConverterConfig::default();
        let converter = Converter::with_encoder(
            Path::new("ffmpeg"),
            Path::new("ffprobe"),
            &settings,
            Encoder::Software,
        );

        let res = converter.convert_folder(&tmp.path().join("missing"), &tmp.path().join("out"));

        assert!(res.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn stopped_conversion_removes_partial_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("episode.mkv");
        let output = tmp.path().join("out").join("episode.mp4");
        let software_tmp = output.with_extension("sw.tmp.mp4");
        fs::write(&input, "not really a video").unwrap();
        fs::create_dir_all(output.parent().unwrap()).unwrap();
        fs::write(&output, "partial").unwrap();
        fs::write(&software_tmp, "partial").unwrap();

        let settings = ConverterConfig::default();
        let stop = AtomicBool::new(true);
        // `sleep` stands in for a long running ffmpeg.
        let converter = Converter::with_encoder(
            Path::new("sleep"),
            Path::new("/definitely/not/ffprobe"),
            &settings,
            Encoder::Software,
        )
        .with_stop_flag(&stop);

        let err = converter.convert_file(&input, &output).unwrap_err();

        assert!(err.is::<Interrupted>());
        assert!(!output.exists());
        assert!(!software_tmp.exists());
        assert!(input.exists());
    }

    #[test]
    fn stopped_folder_conversion_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.mkv"), "x").unwrap();
        let settings = ConverterConfig::default();
        let stop = AtomicBool::new(true);
        let converter = Converter::with_encoder(
            Path::new("ffmpeg"),
            Path::new("ffprobe"),
            &settings,
            Encoder::Software,
        )
        .with_stop_flag(&stop);

        let err = converter
            .convert_folder(tmp.path(), &tmp.path().join("out"))
            .unwrap_err();

        assert!(err.is::<Interrupted>());
        assert!(tmp.path().join("a.mkv").exists());
    }

    #[test]
    fn empty_input_folder_converts_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("notes.txt"), "not a video").unwrap();
        let settings = ConverterConfig::default();
        let converter = Converter::with_encoder(
            Path::new("ffmpeg"),
            Path::new("ffprobe"),
            &settings,
            Encoder::Software,
        );

        let summary = converter
            .convert_folder(tmp.path(), &tmp.path().join("out"))
            .unwrap();

        assert_eq!(summary.total, 0);
        assert!(tmp.path().join("out").is_dir());
    }
}
