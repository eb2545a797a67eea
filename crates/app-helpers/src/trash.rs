use std::{fs, path::Path};

use anyhow::Context;
use app_logger::debug;

/// Get rid of a file we replaced: into the system trash if there is one, deleted otherwise.
pub fn discard(f: &Path) -> anyhow::Result<()> {
    debug!("Sending {f:?} into trash");

    trash::delete(f)
        .or_else(|e| {
            debug!("Failed to put {f:?} into trash: {e:?}");
            debug!("Deleting {f:?}");
            fs::remove_file(f)
        })
        .with_context(|| format!("Failed to delete {f:?}"))
}
