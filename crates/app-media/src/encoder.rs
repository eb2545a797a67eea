use std::{env, fmt, path::Path, process::Command};

use app_helpers::process;
use app_logger::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Software,
    VideoToolbox,
    Nvenc,
}

impl Encoder {
    #[must_use]
    pub const fn codec(self) -> &'static str {
        match self {
            Self::Software => "libx264",
            Self::VideoToolbox => "h264_videotoolbox",
            Self::Nvenc => "h264_nvenc",
        }
    }

    #[must_use]
    pub const fn is_hardware(self) -> bool {
        !matches!(self, Self::Software)
    }

    /// Pick an encoder from the output of `ffmpeg -encoders`.
    ///
    /// VideoToolbox is only considered on macOS, NVENC only on Linux and Windows.
    #[must_use]
    pub fn select(os: &str, available_encoders: &str, use_hardware: bool) -> Self {
        if !use_hardware {
            return Self::Software;
        }

        let candidate = match os {
            "macos" => Self::VideoToolbox,
            "linux" | "windows" => Self::Nvenc,
            _ => return Self::Software,
        };

        if available_encoders.contains(candidate.codec()) {
            candidate
        } else {
            Self::Software
        }
    }

    /// Ask `ffmpeg` which encoders it was built with. Any failure means software.
    #[must_use]
    pub fn detect(ffmpeg_path: &Path, use_hardware: bool) -> Self {
        if !use_hardware {
            return Self::Software;
        }

        let mut cmd = Command::new(ffmpeg_path);
        cmd.arg("-hide_banner").arg("-encoders");

        let encoders = match process::output(&mut cmd) {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Ok(output) => {
                warn!("Listing ffmpeg encoders failed: {}", output.status);
                return Self::Software;
            }
            Err(e) => {
                warn!("Listing ffmpeg encoders failed: {e:?}");
                return Self::Software;
            }
        };

        let encoder = Self::select(env::consts::OS, &encoders, use_hardware);
        debug!("Selected encoder {encoder:?}");
        info!("Using {encoder}");

        encoder
    }
}

impl fmt::Display for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Software => write!(f, "software encoder (libx264)"),
            Self::VideoToolbox => write!(f, "Apple hardware encoder (h264_videotoolbox)"),
            Self::Nvenc => write!(f, "NVIDIA hardware encoder (h264_nvenc)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODERS: &str = " V....D libx264              libx264 H.264 / AVC\n \
                            V....D h264_nvenc           NVIDIA NVENC H.264 encoder\n \
                            V....D h264_videotoolbox    VideoToolbox H.264 Encoder\n";

    #[test]
    fn picks_the_platform_encoder() {
        assert_eq!(Encoder::select("macos", ENCODERS, true), Encoder::VideoToolbox);
        assert_eq!(Encoder::select("linux", ENCODERS, true), Encoder::Nvenc);
        assert_eq!(Encoder::select("windows", ENCODERS, true), Encoder::Nvenc);
    }

    #[test]
    fn falls_back_to_software() {
        assert_eq!(Encoder::select("linux", ENCODERS, false), Encoder::Software);
        assert_eq!(Encoder::select("freebsd", ENCODERS, true), Encoder::Software);
        assert_eq!(
            Encoder::select("linux", " V....D libx264  libx264 H.264\n", true),
            Encoder::Software
        );
    }

    #[test]
    fn missing_ffmpeg_means_software() {
        let encoder = Encoder::detect(Path::new("/definitely/not/ffmpeg"), true);

        assert_eq!(encoder, Encoder::Software);
    }
}
