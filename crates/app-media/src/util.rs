use std::path::Path;

use anyhow::Context;
use app_logger::{debug, trace};
use filetime::FileTime;

/// Read the access and modification times of `path_from` now, apply them to
/// another file later.
pub fn transferable_file_times(
    path_from: &Path,
) -> anyhow::Result<impl FnOnce(&Path) -> anyhow::Result<()>> {
    trace!("Getting file times of {path_from:?}");

    let old_meta = path_from
        .metadata()
        .with_context(|| format!("Failed to get metadata of {path_from:?}"))?;

    Ok(move |path_to: &Path| {
        trace!("Setting file times of {path_to:?}");

        filetime::set_file_times(
            path_to,
            FileTime::from_last_access_time(&old_meta),
            FileTime::from_last_modification_time(&old_meta),
        )
        .with_context(|| format!("Failed to set file times of {path_to:?}"))
    })
}

/// Best effort, a failure is only logged.
pub fn copy_file_times(from: &Path, to: &Path) {
    let res = transferable_file_times(from).and_then(|transfer_to| transfer_to(to));

    if let Err(e) = res {
        debug!("Failed to transfer file times: {e:?}");
    }
}
