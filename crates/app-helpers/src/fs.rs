use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use app_logger::{debug, trace};

use crate::progress;

const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Case-insensitive extension check. `extensions` are written with the dot, e.g. `.mkv`.
#[must_use]
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|x| x.to_str()) else {
        return false;
    };
    let ext = format!(".{}", ext.to_lowercase());

    extensions.iter().any(|x| x.to_lowercase() == ext)
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {dir:?}"))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read directory {dir:?}"))?
        .into_iter()
        .filter(|p| p.is_file())
        .collect::<Vec<_>>();

    files.sort();

    Ok(files)
}

/// Like [`list_files`], keeping only the given extensions.
pub fn list_files_with_extensions(
    dir: &Path,
    extensions: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| has_extension(p, extensions))
        .collect())
}

#[must_use]
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Move `src` to `dst`.
///
/// A plain rename when both sit on the same filesystem, otherwise a copy with a
/// byte progress bar followed by removing `src`.
pub fn move_file(src: &Path, dst: &Path) -> anyhow::Result<()> {
    debug!("Moving {src:?} to {dst:?}");

    match fs::rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => trace!("Rename of {src:?} failed ({e:?}), copying instead"),
    }

    copy_with_progress(src, dst)?;
    fs::remove_file(src).with_context(|| format!("Failed to remove {src:?} after copying"))?;

    Ok(())
}

pub fn copy_with_progress(src: &Path, dst: &Path) -> anyhow::Result<u64> {
    let size = src
        .metadata()
        .with_context(|| format!("Failed to read metadata of {src:?}"))?
        .len();

    let bar = progress::bytes_bar(size, &file_name_lossy(src));

    let mut reader = BufReader::with_capacity(
        COPY_BUFFER_SIZE,
        File::open(src).with_context(|| format!("Failed to open {src:?}"))?,
    );
    let mut writer = BufWriter::with_capacity(
        COPY_BUFFER_SIZE,
        File::create(dst).with_context(|| format!("Failed to create {dst:?}"))?,
    );

    let mut buf = vec![0; COPY_BUFFER_SIZE];
    let mut copied = 0_u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).with_context(|| format!("Failed to read {src:?}")),
        };

        writer
            .write_all(&buf[..n])
            .with_context(|| format!("Failed to write {dst:?}"))?;
        copied += n as u64;
        bar.set_position(copied);
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {dst:?}"))?;

    bar.finish_and_clear();

    Ok(copied)
}

/// Move `src` into `dir`, keeping its file name.
pub fn move_into(src: &Path, dir: &Path) -> anyhow::Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("{src:?} has no file name"))?;
    let dst = dir.join(name);

    move_file(src, &dst)?;

    Ok(dst)
}

/// Rename every regular file in `dir` to `<prefix><name>`.
///
/// Files already carrying the prefix are left alone unless `force` is set.
/// Returns the new paths.
pub fn add_prefix(dir: &Path, prefix: &str, force: bool) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{dir:?} is not a directory");
    }

    let mut renamed = vec![];

    for old_path in list_files(dir)? {
        let Some(name) = old_path.file_name() else {
            continue;
        };

        if !force && name.to_string_lossy().starts_with(prefix) {
            debug!("{name:?} already has the prefix, skipping");
            continue;
        }

        let mut new_name = OsString::from(prefix);
        new_name.push(name);
        let new_path = old_path.with_file_name(new_name);

        if new_path.exists() {
            bail!("Refusing to rename {old_path:?}: {new_path:?} already exists");
        }

        debug!("Renaming {old_path:?} to {new_path:?}");
        fs::rename(&old_path, &new_path)
            .with_context(|| format!("Failed to rename {old_path:?} to {new_path:?}"))?;

        renamed.push(new_path);
    }

    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|x| (*x).to_string()).collect()
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, name).unwrap();
        p
    }

    #[test]
    fn extension_check_ignores_case() {
        let videos = exts(&[".mp4", ".mkv"]);

        assert!(has_extension(Path::new("a/b.MKV"), &videos));
        assert!(has_extension(Path::new("b.mp4"), &videos));
        assert!(!has_extension(Path::new("b.mp4.part"), &videos));
        assert!(!has_extension(Path::new("mp4"), &videos));
    }

    #[test]
    fn lists_sorted_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "b.mkv");
        touch(tmp.path(), "a.mp4");
        touch(tmp.path(), "notes.txt");
        fs::create_dir(tmp.path().join("sub.mp4")).unwrap();

        let all = list_files(tmp.path()).unwrap();
        assert_eq!(all.len(), 3);

        let videos = list_files_with_extensions(tmp.path(), &exts(&[".mp4", ".mkv"])).unwrap();
        let names = videos.iter().map(|p| file_name_lossy(p)).collect::<Vec<_>>();
        assert_eq!(names, vec!["a.mp4", "b.mkv"]);
    }

    #[test]
    fn listing_a_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(list_files(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn move_into_keeps_the_name() {
        let tmp = tempfile::tempdir().unwrap();
        let src = touch(tmp.path(), "episode.srt");
        let dst_dir = tmp.path().join("out");
        fs::create_dir(&dst_dir).unwrap();

        let dst = move_into(&src, &dst_dir).unwrap();

        assert_eq!(dst, dst_dir.join("episode.srt"));
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst).unwrap(), "episode.srt");
    }

    #[test]
    fn copy_with_progress_copies_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("big.bin");
        let data = (0..3 * COPY_BUFFER_SIZE + 17)
            .map(|i| (i % 251) as u8)
            .collect::<Vec<_>>();
        fs::write(&src, &data).unwrap();
        let dst = tmp.path().join("copy.bin");

        let copied = copy_with_progress(&src, &dst).unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(fs::read(&dst).unwrap(), data);
        assert!(src.exists());
    }

    #[test]
    fn prefixes_files_but_not_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "S01E01.mkv");
        touch(tmp.path(), "S01E02.mkv");
        fs::create_dir(tmp.path().join("extras")).unwrap();

        let renamed = add_prefix(tmp.path(), "Breaking Bad ", false).unwrap();

        assert_eq!(renamed.len(), 2);
        assert!(tmp.path().join("Breaking Bad S01E01.mkv").exists());
        assert!(tmp.path().join("Breaking Bad S01E02.mkv").exists());
        assert!(tmp.path().join("extras").is_dir());
    }

    #[test]
    fn already_prefixed_files_need_force() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Show S01E01.mkv");

        assert!(add_prefix(tmp.path(), "Show ", false).unwrap().is_empty());

        let renamed = add_prefix(tmp.path(), "Show ", true).unwrap();
        assert_eq!(renamed, vec![tmp.path().join("Show Show S01E01.mkv")]);
    }

    #[test]
    fn prefix_on_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(add_prefix(&tmp.path().join("nope"), "x", false).is_err());
    }
}
