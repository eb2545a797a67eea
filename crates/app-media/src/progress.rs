//! Following `ffmpeg -progress pipe:1` output.

use std::{
    io::{BufRead, BufReader, Read},
    process::{Command, ExitStatus, Stdio},
    sync::atomic::AtomicBool,
    thread,
    time::Duration,
};

use anyhow::Context;
use app_logger::{debug, trace, warn};
use indicatif::ProgressBar;

use crate::interrupt::{is_interrupted, Interrupted};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// Seconds of output written so far.
    OutTime(f64),
    End,
}

fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let h = parts.next()?.parse::<f64>().ok()?;
    let m = parts.next()?.parse::<f64>().ok()?;
    let s = parts.next()?.parse::<f64>().ok()?;

    if parts.next().is_some() {
        return None;
    }

    Some(h * 3600.0 + m * 60.0 + s)
}

/// One `key=value` line of the progress output.
///
/// `out_time_ms` is in microseconds despite its name.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_ms" | "out_time_us" => value
            .parse::<i64>()
            .ok()
            .map(|us| ProgressEvent::OutTime(us as f64 / 1_000_000.0)),
        "out_time" => parse_timestamp(value).map(ProgressEvent::OutTime),
        "progress" if value == "end" => Some(ProgressEvent::End),
        _ => None,
    }
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent(out_seconds: f64, duration: f64) -> u64 {
    if duration <= 0.0 || out_seconds <= 0.0 {
        return 0;
    }

    ((out_seconds / duration) * 100.0).min(100.0) as u64
}

#[derive(Debug)]
pub struct FfmpegRun {
    pub status: ExitStatus,
    pub stderr: String,
}

impl FfmpegRun {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

fn follow_progress(stdout: impl Read, duration: Option<f64>, bar: &ProgressBar) {
    let mut last_percent = 0;

    for line in BufReader::new(stdout).lines().map_while(Result::ok) {
        match parse_progress_line(&line) {
            Some(ProgressEvent::OutTime(out)) => {
                let Some(duration) = duration else {
                    continue;
                };
                let p = percent(out, duration);
                if p > last_percent {
                    bar.set_position(p);
                    last_percent = p;
                }
            }
            Some(ProgressEvent::End) => bar.set_position(100),
            None => {}
        }
    }
}

/// Run an `ffmpeg` command built with `-progress pipe:1`, moving `bar` from 0 to 100.
///
/// Without a known `duration` the bar only jumps to 100 at the end.
/// Once `stop` is set the process is killed and [`Interrupted`] is returned.
pub fn run_with_progress(
    cmd: &mut Command,
    duration: Option<f64>,
    bar: &ProgressBar,
    stop: &AtomicBool,
) -> anyhow::Result<FfmpegRun> {
    debug!("Running command: {cmd:?}");

    // Ctrl+C only reaches the child through `stop`.
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(cmd, 0);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run {:?}", cmd.get_program()))?;

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        })
    });

    let stdout_reader = child.stdout.take().map(|stdout| {
        let bar = bar.clone();
        thread::spawn(move || follow_progress(stdout, duration, &bar))
    });

    let status = loop {
        if is_interrupted(stop) {
            warn!("Stopping {:?} (pid {})", cmd.get_program(), child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Err(Interrupted.into());
        }

        if let Some(status) = child.try_wait().context("Failed to wait for ffmpeg")? {
            break status;
        }

        thread::sleep(POLL_INTERVAL);
    };

    if let Some(h) = stdout_reader {
        let _ = h.join();
    }
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    trace!("ffmpeg exited with {status:?}");

    Ok(FfmpegRun { status, stderr })
}
