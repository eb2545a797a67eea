use std::process::{Command, Output};

use anyhow::{bail, Context};
use app_logger::{debug, trace};

/// Run a command to completion, capturing stdout and stderr.
///
/// Only failing to start the program is an error here; callers decide what a
/// non-zero exit means.
pub fn output(cmd: &mut Command) -> anyhow::Result<Output> {
    debug!("Running command: {cmd:?}");

    let output = cmd
        .output()
        .with_context(|| format!("Failed to run {:?}", cmd.get_program()))?;

    trace!(
        "Command {:?} exited with {:?}",
        cmd.get_program(),
        output.status
    );

    Ok(output)
}

/// Like [`output`] but a non-zero exit is an error carrying the tail of stderr.
pub fn checked_output(cmd: &mut Command) -> anyhow::Result<Output> {
    let output = output(cmd)?;

    if !output.status.success() {
        bail!(
            "{:?} exited with {}: {}",
            cmd.get_program(),
            output.status,
            excerpt(&output.stderr, 300)
        );
    }

    Ok(output)
}

/// First `max` characters of some (possibly binary) tool output, trimmed.
#[must_use]
pub fn excerpt(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();

    if text.chars().count() <= max {
        return text.to_string();
    }

    let mut res = text.chars().take(max).collect::<String>();
    res.push('…');
    res
}
