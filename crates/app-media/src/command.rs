//! `ffmpeg` invocations for the converter.

use std::{path::Path, process::Command};

use app_config::ConverterConfig;

use crate::encoder::Encoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub crf: u8,
    pub hw_maxrate: String,
    pub hw_bufsize: String,
    pub audio_bitrate: String,
    pub max_width: u32,
    pub max_height: u32,
    /// Add the downscale filter.
    pub scale: bool,
    /// Source audio is already AAC.
    pub copy_audio: bool,
    /// Leave subtitle streams out of the output.
    pub drop_subtitles: bool,
}

impl EncodeOptions {
    #[must_use]
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            crf: config.crf,
            hw_maxrate: config.hw_maxrate.clone(),
            hw_bufsize: config.hw_bufsize.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            max_width: config.max_width,
            max_height: config.max_height,
            scale: false,
            copy_audio: false,
            drop_subtitles: true,
        }
    }
}

/// Fit into `max_width`x`max_height` keeping the aspect ratio and even dimensions.
#[must_use]
pub fn scale_filter(max_width: u32, max_height: u32) -> String {
    let ar = f64::from(max_width) / f64::from(max_height);

    format!("scale='if(gt(iw/ih,{ar}),{max_width},-2)':'if(gt(iw/ih,{ar}),-2,{max_height})'")
}

fn with_progress_output(cmd: &mut Command, output: &Path) {
    cmd.args(["-progress", "pipe:1"])
        .arg("-nostats")
        .args(["-loglevel", "error"])
        .arg(output);
}

#[must_use]
pub fn encode(
    ffmpeg_path: &Path,
    input: &Path,
    output: &Path,
    encoder: Encoder,
    options: &EncodeOptions,
) -> Command {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-hide_banner").arg("-y").arg("-i").arg(input);

    cmd.args(["-c:v", encoder.codec()]);
    match encoder {
        Encoder::VideoToolbox => {
            cmd.args(["-pix_fmt", "yuv420p"])
                .args(["-profile:v", "high"])
                .args(["-level", "4.1"])
                .args(["-q:v", "18"])
                .args(["-b:v", options.hw_maxrate.as_str()])
                .args(["-maxrate", options.hw_maxrate.as_str()])
                .args(["-bufsize", options.hw_bufsize.as_str()]);
        }
        Encoder::Nvenc => {
            cmd.args(["-pix_fmt", "yuv420p"])
                .args(["-profile:v", "high"])
                .args(["-level", "4.1"])
                .args(["-preset", "p4"])
                .args(["-rc", "vbr"])
                .args(["-cq", "19"])
                .args(["-b:v", "0"])
                .args(["-maxrate", options.hw_maxrate.as_str()])
                .args(["-bufsize", options.hw_bufsize.as_str()]);
        }
        Encoder::Software => {
            cmd.args(["-preset", "slow"])
                .args(["-crf", options.crf.to_string().as_str()])
                .args(["-pix_fmt", "yuv420p"])
                .args(["-profile:v", "high"])
                .args(["-level", "4.1"]);
        }
    }

    if options.scale {
        cmd.arg("-vf")
            .arg(scale_filter(options.max_width, options.max_height));
    }

    if options.copy_audio {
        cmd.args(["-c:a", "copy"]);
    } else {
        cmd.args(["-c:a", "aac"])
            .args(["-b:a", options.audio_bitrate.as_str()])
            .args(["-ac", "2"]);
    }

    if options.drop_subtitles {
        cmd.arg("-sn");
    }

    cmd.args(["-movflags", "+faststart"]).args(["-f", "mp4"]);
    with_progress_output(&mut cmd, output);

    cmd
}

/// Stream copy into an MP4 container.
#[must_use]
pub fn remux(ffmpeg_path: &Path, input: &Path, output: &Path) -> Command {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-hide_banner")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-c", "copy"])
        .args(["-movflags", "+faststart"]);
    with_progress_output(&mut cmd, output);

    cmd
}
