//! Ctrl+C handling for long running `ffmpeg` jobs.
//!
//! The first Ctrl+C only raises a flag. Whoever is waiting on `ffmpeg` kills it
//! and returns [`Interrupted`] so the usual cleanup runs. A second Ctrl+C exits
//! right away.

use std::{
    fmt,
    process::exit,
    sync::{
        atomic::{AtomicBool, Ordering},
        Once,
    },
};

use anyhow::Context;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INSTALL: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Install the Ctrl+C handler. Calling this again does nothing.
pub fn install() -> anyhow::Result<()> {
    let mut res = Ok(());

    INSTALL.call_once(|| {
        res = ctrlc::set_handler(|| {
            if INTERRUPTED.swap(true, Ordering::SeqCst) {
                exit(130);
            }
            eprintln!("\n⏹ Interrupted, stopping the current job (press Ctrl+C again to quit now)");
        });
    });

    res.context("Failed to install the Ctrl+C handler")
}

/// The flag set by the handler.
#[must_use]
pub fn flag() -> &'static AtomicBool {
    &INTERRUPTED
}

#[must_use]
pub fn is_interrupted(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}
