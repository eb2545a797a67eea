//! Show artwork grabbed from random frames of the episodes.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::bail;
use app_helpers::{ffprobe, process};
use app_logger::{debug, warn};
use rand::{seq::SliceRandom, Rng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtKind {
    Poster,
    Fanart,
}

impl ArtKind {
    #[must_use]
    pub const fn base_name(self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Fanart => "fanart",
        }
    }

    #[must_use]
    pub const fn size(self) -> (u32, u32) {
        match self {
            Self::Poster => (1000, 1500),
            Self::Fanart => (1920, 1080),
        }
    }

    /// Part of the video frames are taken from, as fractions of the duration.
    #[must_use]
    pub const fn window(self) -> (f64, f64) {
        match self {
            Self::Poster => (0.2, 0.8),
            Self::Fanart => (0.1, 0.9),
        }
    }

    /// `poster.jpg`, `poster-2.jpg`, ...
    #[must_use]
    pub fn file_name(self, n: usize) -> String {
        if n <= 1 {
            format!("{}.jpg", self.base_name())
        } else {
            format!("{}-{n}.jpg", self.base_name())
        }
    }

    /// Fill the frame and crop the overflow.
    #[must_use]
    pub fn filter(self) -> String {
        let (w, h) = self.size();

        format!("scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}")
    }
}

#[must_use]
pub fn pick_timestamp<R: Rng>(kind: ArtKind, duration: f64, rng: &mut R) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }

    let (from, to) = kind.window();

    rng.gen_range(duration * from..=duration * to)
}

pub fn grab_frame(
    ffmpeg_path: &Path,
    video: &Path,
    timestamp: f64,
    kind: ArtKind,
    output: &Path,
) -> anyhow::Result<()> {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-ss")
        .arg(format!("{timestamp:.3}"))
        .arg("-i")
        .arg(video)
        .args(["-vframes", "1"])
        .arg("-vf")
        .arg(kind.filter())
        .arg("-y")
        .arg(output);

    let out = process::output(&mut cmd)?;
    if !out.status.success() || !output.exists() {
        bail!(
            "Grabbing a frame of {video:?} failed: {}",
            process::excerpt(&out.stderr, 200)
        );
    }

    Ok(())
}

pub struct ArtGenerator<'a> {
    pub ffmpeg: &'a Path,
    pub ffprobe: &'a Path,
}

impl ArtGenerator<'_> {
    fn generate_one<R: Rng>(
        &self,
        kind: ArtKind,
        video: &Path,
        output: &Path,
        rng: &mut R,
    ) -> anyhow::Result<()> {
        let duration = ffprobe::ffprobe(self.ffprobe, video)?
            .duration_seconds()
            .unwrap_or_default();
        let timestamp = pick_timestamp(kind, duration, rng);
        debug!("Taking {kind:?} from {video:?} at {timestamp:.1}s");

        grab_frame(self.ffmpeg, video, timestamp, kind, output)
    }

    /// Write `posters` posters and `fanarts` fanart images into `show_dir`,
    /// each from a randomly picked video. Failed images are skipped.
    pub fn generate<R: Rng>(
        &self,
        videos: &[PathBuf],
        show_dir: &Path,
        posters: usize,
        fanarts: usize,
        rng: &mut R,
    ) -> Vec<PathBuf> {
        let jobs = (1..=posters)
            .map(|n| (ArtKind::Poster, n))
            .chain((1..=fanarts).map(|n| (ArtKind::Fanart, n)));

        let mut written = vec![];
        for (kind, n) in jobs {
            let Some(video) = videos.choose(&mut *rng) else {
                break;
            };
            let output = show_dir.join(kind.file_name(n));

            match self.generate_one(kind, video, &output, rng) {
                Ok(()) => written.push(output),
                Err(e) => warn!("Failed to generate {output:?}: {e:?}"),
            }
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(ArtKind::Poster.file_name(1), "poster.jpg");
        assert_eq!(ArtKind::Poster.file_name(2), "poster-2.jpg");
        assert_eq!(ArtKind::Fanart.file_name(1), "fanart.jpg");
        assert_eq!(ArtKind::Fanart.file_name(10), "fanart-10.jpg");
    }

    #[test]
    fn filters() {
        assert_eq!(
            ArtKind::Poster.filter(),
            "scale=1000:1500:force_original_aspect_ratio=increase,crop=1000:1500"
        );
        assert_eq!(
            ArtKind::Fanart.filter(),
            "scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080"
        );
    }

    #[test]
    fn timestamps_stay_in_the_window() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let t = pick_timestamp(ArtKind::Poster, 100.0, &mut rng);
            assert!((19.999..=80.001).contains(&t));

            let t = pick_timestamp(ArtKind::Fanart, 100.0, &mut rng);
            assert!((9.999..=90.001).contains(&t));
        }
    }

    #[test]
    fn unknown_duration_starts_at_zero() {
        let mut rng = StdRng::seed_from_u64(7);

        assert!(pick_timestamp(ArtKind::Poster, 0.0, &mut rng).abs() < f64::EPSILON);
        assert!(pick_timestamp(ArtKind::Fanart, f64::INFINITY, &mut rng).abs() < f64::EPSILON);
        assert!(pick_timestamp(ArtKind::Poster, f64::NAN, &mut rng).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_to_pick_from() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = ArtGenerator {
            ffmpeg: Path::new("ffmpeg"),
            ffprobe: Path::new("ffprobe"),
        };

        let written = generator.generate(&[], tmp.path(), 5, 10, &mut StdRng::seed_from_u64(1));

        assert!(written.is_empty());
    }

    #[test]
    fn failures_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = ArtGenerator {
            ffmpeg: Path::new("/definitely/not/ffmpeg"),
            ffprobe: Path::new("/definitely/not/ffprobe"),
        };

        let written = generator.generate(
            &[tmp.path().join("S01E001 a.mp4")],
            tmp.path(),
            2,
            2,
            &mut StdRng::seed_from_u64(1),
        );

        assert!(written.is_empty());
    }
}
