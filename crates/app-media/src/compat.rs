//! Direct-play compatibility rules.
//!
//! Two targets share the same checks with slightly different strictness: the
//! `check` report is strict about stream fields and every audio track, the
//! converter only needs one usable AAC track and also caps the resolution.

use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use app_helpers::ffprobe::{self, FfProbeResult, Stream};
use app_logger::debug;

const H264_PROFILES: [&str; 3] = ["baseline", "main", "high"];
const MAX_H264_LEVEL: u32 = 41;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRule {
    /// Every audio stream has to be AAC.
    EveryStreamAac,
    /// At least one AAC stream has to exist.
    SomeStreamAac,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub containers: &'static [&'static str],
    /// A container mismatch is reported either way, this decides if it fails the file.
    pub container_is_fatal: bool,
    pub max_resolution: Option<(u32, u32)>,
    pub audio: AudioRule,
    /// Treat a missing pixel format or profile as wrong instead of unknown.
    pub strict_stream_fields: bool,
    /// Check only the first video stream, and require one to exist.
    pub first_video_only: bool,
}

impl TargetProfile {
    /// What the `check` command reports against.
    #[must_use]
    pub const fn direct_play() -> Self {
        Self {
            containers: &["mp4"],
            container_is_fatal: false,
            max_resolution: None,
            audio: AudioRule::EveryStreamAac,
            strict_stream_fields: true,
            first_video_only: false,
        }
    }

    /// What converted files have to satisfy.
    #[must_use]
    pub const fn conversion(max_width: u32, max_height: u32) -> Self {
        Self {
            containers: &["mp4", "mov"],
            container_is_fatal: true,
            max_resolution: Some((max_width, max_height)),
            audio: AudioRule::SomeStreamAac,
            strict_stream_fields: false,
            first_video_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    ProbeFailed,
    Container { found: String, expected: String },
    NoVideoStream,
    VideoCodec(String),
    PixelFormat(String),
    Level(u32),
    Profile(String),
    Resolution { width: u32, height: u32, max_width: u32, max_height: u32 },
    AudioCodec(String),
    NoAacAudio,
    EmbeddedSubtitle(String),
    SubtitlesForceTranscode,
}

impl Issue {
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Container { .. })
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeFailed => write!(f, "ffprobe failed"),
            Self::Container { found, expected } => {
                write!(f, "Container is {found}, expected {expected}")
            }
            Self::NoVideoStream => write!(f, "No video stream"),
            Self::VideoCodec(codec) => write!(f, "Video codec is {codec}, expected h264"),
            Self::PixelFormat(pix_fmt) => {
                write!(f, "Pixel format is {pix_fmt}, expected yuv420p")
            }
            Self::Level(level) => write!(
                f,
                "H.264 level {}.{} > {}.{}",
                level / 10,
                level % 10,
                MAX_H264_LEVEL / 10,
                MAX_H264_LEVEL % 10
            ),
            Self::Profile(profile) => write!(f, "Unsupported profile: {profile}"),
            Self::Resolution {
                width,
                height,
                max_width,
                max_height,
            } => write!(f, "Res {width}x{height} > {max_width}x{max_height}"),
            Self::AudioCodec(codec) => write!(f, "Audio codec is {codec}, expected AAC"),
            Self::NoAacAudio => write!(f, "No AAC audio track"),
            Self::EmbeddedSubtitle(codec) => write!(f, "Embedded subtitle: {codec}"),
            Self::SubtitlesForceTranscode => {
                write!(f, "Embedded subtitles trigger transcoding on iOS")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub passed: bool,
    pub issues: Vec<Issue>,
}

impl Report {
    fn probe_failed() -> Self {
        Self {
            passed: false,
            issues: vec![Issue::ProbeFailed],
        }
    }

    /// Everything is fine apart from the container, so a stream copy fixes it.
    #[must_use]
    pub fn only_container_issues(&self) -> bool {
        !self.issues.is_empty() && self.issues.iter().all(Issue::is_container)
    }
}

#[allow(clippy::too_many_lines)]
#[must_use]
pub fn analyze(probe: &FfProbeResult, target: &TargetProfile) -> Report {
    let mut issues = vec![];
    let mut fatal = false;

    if !probe.container_is_one_of(target.containers) {
        issues.push(Issue::Container {
            found: probe.format.format_name.clone(),
            expected: target.containers.join("/").to_uppercase(),
        });
        fatal |= target.container_is_fatal;
    }

    if target.first_video_only && probe.video_stream().is_none() {
        issues.extend(
            probe
                .subtitle_streams()
                .map(|s| Issue::EmbeddedSubtitle(s.codec().to_string())),
        );
        issues.push(Issue::NoVideoStream);
        return Report {
            passed: false,
            issues,
        };
    }

    // Issues are listed in stream order.
    let mut seen_video = false;
    let mut has_subtitles = false;
    for stream in &probe.streams {
        if stream.is_video() {
            if target.first_video_only && seen_video {
                continue;
            }
            seen_video = true;

            let video_issues = check_video_stream(stream, target);
            fatal |= !video_issues.is_empty();
            issues.extend(video_issues);
        } else if stream.is_audio() {
            if target.audio == AudioRule::EveryStreamAac && stream.codec() != "aac" {
                issues.push(Issue::AudioCodec(stream.codec().to_string()));
                fatal = true;
            }
        } else if stream.is_subtitle() {
            issues.push(Issue::EmbeddedSubtitle(stream.codec().to_string()));
            has_subtitles = true;
        }
    }

    if target.audio == AudioRule::SomeStreamAac && !probe.has_aac_audio() {
        issues.push(Issue::NoAacAudio);
        fatal = true;
    }

    if has_subtitles {
        issues.push(Issue::SubtitlesForceTranscode);
        fatal = true;
    }

    Report {
        passed: !fatal,
        issues,
    }
}

fn check_video_stream(video: &Stream, target: &TargetProfile) -> Vec<Issue> {
    let mut issues = vec![];

    if video.codec() != "h264" {
        issues.push(Issue::VideoCodec(video.codec().to_string()));
    }

    let pix_fmt = video.pix_fmt.as_deref().unwrap_or_default();
    if pix_fmt != "yuv420p" && (target.strict_stream_fields || !pix_fmt.is_empty()) {
        issues.push(Issue::PixelFormat(pix_fmt.to_string()));
    }

    if let Some(level) = video.h264_level() {
        if level > MAX_H264_LEVEL {
            issues.push(Issue::Level(level));
        }
    }

    let profile = video.profile.as_deref().unwrap_or_default();
    if !H264_PROFILES.contains(&profile.to_lowercase().as_str())
        && (target.strict_stream_fields || !profile.is_empty())
    {
        issues.push(Issue::Profile(profile.to_string()));
    }

    if let Some((max_width, max_height)) = target.max_resolution {
        let width = video.width.unwrap_or_default();
        let height = video.height.unwrap_or_default();

        if width > max_width || height > max_height {
            issues.push(Issue::Resolution {
                width,
                height,
                max_width,
                max_height,
            });
        }
    }

    issues
}

/// Probe and analyze a file. A failing ffprobe is reported, not returned as an error.
#[must_use]
pub fn check_file(ffprobe_path: &Path, file: &Path, target: &TargetProfile) -> Report {
    match ffprobe::ffprobe(ffprobe_path, file) {
        Ok(probe) => analyze(&probe, target),
        Err(e) => {
            debug!("Probing {file:?} failed: {e:?}");
            Report::probe_failed()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FolderReport {
    pub files: Vec<(PathBuf, Report)>,
}

impl FolderReport {
    #[must_use]
    pub fn ready(&self) -> usize {
        self.files.iter().filter(|(_, r)| r.passed).count()
    }

    #[must_use]
    pub fn needs_fixing(&self) -> usize {
        self.files.len() - self.ready()
    }
}

#[must_use]
pub fn check_files(ffprobe_path: &Path, files: &[PathBuf], target: &TargetProfile) -> FolderReport {
    FolderReport {
        files: files
            .iter()
            .map(|f| (f.clone(), check_file(ffprobe_path, f, target)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(json: &str) -> FfProbeResult {
        FfProbeResult::parse(json).unwrap()
    }

    const GOOD_MP4: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "profile": "High",
             "pix_fmt": "yuv420p", "level": 40, "width": 1920, "height": 1080},
            {"index": 1, "codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "60.0"}
    }"#;

    const MKV_H264_AAC: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "profile": "Main",
             "pix_fmt": "yuv420p", "level": 31, "width": 1280, "height": 720},
            {"index": 1, "codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"format_name": "matroska,webm"}
    }"#;

    const WEBM_VP9: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "vp9", "profile": "Profile 0",
             "pix_fmt": "yuv420p", "width": 3840, "height": 2160},
            {"index": 1, "codec_type": "audio", "codec_name": "opus"},
            {"index": 2, "codec_type": "subtitle", "codec_name": "webvtt"}
        ],
        "format": {"format_name": "matroska,webm"}
    }"#;

    #[test]
    fn compatible_mp4_passes_both_targets() {
        let p = probe(GOOD_MP4);

        let direct = analyze(&p, &TargetProfile::direct_play());
        assert!(direct.passed);
        assert!(direct.issues.is_empty());

        let conversion = analyze(&p, &TargetProfile::conversion(3840, 2160));
        assert!(conversion.passed);
    }

    #[test]
    fn wrong_container_is_reported_but_only_fatal_for_conversion() {
        let p = probe(MKV_H264_AAC);

        let direct = analyze(&p, &TargetProfile::direct_play());
        assert!(direct.passed);
        assert_eq!(
            direct.issues[0].to_string(),
            "Container is matroska,webm, expected MP4"
        );

        let conversion = analyze(&p, &TargetProfile::conversion(3840, 2160));
        assert!(!conversion.passed);
        assert!(conversion.only_container_issues());
    }

    #[test]
    fn vp9_webm_collects_every_problem() {
        let p = probe(WEBM_VP9);

        let report = analyze(&p, &TargetProfile::direct_play());
        let messages = report
            .issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        assert!(!report.passed);
        assert_eq!(
            messages,
            vec![
                "Container is matroska,webm, expected MP4",
                "Video codec is vp9, expected h264",
                "Unsupported profile: Profile 0",
                "Audio codec is opus, expected AAC",
                "Embedded subtitle: webvtt",
                "Embedded subtitles trigger transcoding on iOS",
            ]
        );
    }

    #[test]
    fn issues_follow_stream_order() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "h264", "profile": "High",
                             "pix_fmt": "yuv420p", "level": 40},
                            {"codec_type": "subtitle", "codec_name": "subrip"},
                            {"codec_type": "audio", "codec_name": "ac3"},
                            {"codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle"},
                            {"codec_type": "audio", "codec_name": "dts"}],
                "format": {"format_name": "mov,mp4"}}"#,
        );

        let report = analyze(&p, &TargetProfile::direct_play());

        assert_eq!(
            report.issues,
            vec![
                Issue::EmbeddedSubtitle("subrip".into()),
                Issue::AudioCodec("ac3".into()),
                Issue::EmbeddedSubtitle("hdmv_pgs_subtitle".into()),
                Issue::AudioCodec("dts".into()),
                Issue::SubtitlesForceTranscode,
            ]
        );
    }

    #[test]
    fn conversion_target_caps_resolution() {
        let p = probe(WEBM_VP9);

        let report = analyze(&p, &TargetProfile::conversion(1920, 1080));

        assert!(report.issues.contains(&Issue::Resolution {
            width: 3840,
            height: 2160,
            max_width: 1920,
            max_height: 1080,
        }));
        assert!(report.issues.contains(&Issue::NoAacAudio));
        assert!(!report.only_container_issues());
    }

    #[test]
    fn level_above_4_1_fails() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "h264", "profile": "High",
                "pix_fmt": "yuv420p", "level": 51}],
                "format": {"format_name": "mov,mp4"}}"#,
        );

        let report = analyze(&p, &TargetProfile::direct_play());

        assert!(!report.passed);
        assert_eq!(report.issues, vec![Issue::Level(51)]);
        assert_eq!(report.issues[0].to_string(), "H.264 level 5.1 > 4.1");
    }

    #[test]
    fn missing_fields_only_matter_for_the_strict_target() {
        let p = probe(
            r#"{"streams": [{"codec_type": "video", "codec_name": "h264"},
                            {"codec_type": "audio", "codec_name": "aac"}],
                "format": {"format_name": "mov,mp4"}}"#,
        );

        let direct = analyze(&p, &TargetProfile::direct_play());
        assert!(!direct.passed);
        assert_eq!(
            direct.issues,
            vec![
                Issue::PixelFormat(String::new()),
                Issue::Profile(String::new())
            ]
        );

        let conversion = analyze(&p, &TargetProfile::conversion(3840, 2160));
        assert!(conversion.passed);
    }

    #[test]
    fn audio_only_file_has_no_video_for_conversion() {
        let p = probe(
            r#"{"streams": [{"codec_type": "audio", "codec_name": "aac"}],
                "format": {"format_name": "mov,mp4"}}"#,
        );

        let report = analyze(&p, &TargetProfile::conversion(3840, 2160));

        assert!(!report.passed);
        assert_eq!(report.issues, vec![Issue::NoVideoStream]);
    }

    #[test]
    fn folder_report_counts() {
        let report = FolderReport {
            files: vec![
                ("a.mp4".into(), Report { passed: true, issues: vec![] }),
                ("b.mkv".into(), Report::probe_failed()),
                ("c.mkv".into(), Report { passed: true, issues: vec![] }),
            ],
        };

        assert_eq!(report.ready(), 2);
        assert_eq!(report.needs_fixing(), 1);
    }
}
