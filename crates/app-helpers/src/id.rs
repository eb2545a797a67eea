use std::{process, time};

use base64::Engine;

fn now_ns() -> u128 {
    time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos())
}

/// A short id that is unique per process and moment, safe to use in file names.
#[must_use]
pub fn work_id() -> String {
    let id = format!("{}-{}", now_ns(), process::id());

    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(id)
}
