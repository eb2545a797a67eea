use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use app_logger::trace;

use crate::id::work_id;

pub fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.exists() {
        trace!("Creating {dir:?}");
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {dir:?}"))?;
    }

    Ok(())
}

/// Create a fresh, uniquely named directory inside `parent`.
pub fn create_work_dir(parent: &Path) -> anyhow::Result<PathBuf> {
    let dir = parent.join(format!("job-{}", work_id()));

    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {dir:?}"))?;
    trace!("Using {dir:?} as work dir");

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");

        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();

        assert!(dir.is_dir());
    }

    #[test]
    fn work_dir_is_created_inside_parent() {
        let tmp = tempfile::tempdir().unwrap();

        let dir = create_work_dir(tmp.path()).unwrap();

        assert!(dir.is_dir());
        assert_eq!(dir.parent(), Some(tmp.path()));
    }
}
