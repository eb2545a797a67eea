use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use app_helpers::dirs;
use app_logger::{debug, trace};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

static VIDEO_LINK_MATCH: OnceCell<Regex> = OnceCell::new();

const VIDEO_LINK_PATTERN: &str = r"youtube\.com/watch|youtu\.be/";
const PREVIEW_LENGTH: usize = 60;

fn video_link_regex() -> anyhow::Result<&'static Regex> {
    VIDEO_LINK_MATCH.get_or_try_init(|| {
        Regex::new(VIDEO_LINK_PATTERN).context("Failed to build the video link pattern")
    })
}

pub fn is_video_link(text: &str) -> anyhow::Result<bool> {
    Ok(video_link_regex()?.is_match(text))
}

/// At most `max` characters of `text`, with `...` appended when cut.
#[must_use]
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let mut res = text.chars().take(max).collect::<String>();
    res.push_str("...");
    res
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { link: String, total: usize },
    AlreadyExists,
    NotAVideoLink { preview: String },
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { link, total } => {
                write!(f, "✓ Saved: {link}\n📊 Total links: {total}")
            }
            Self::AlreadyExists => write!(f, "⚠ Link already exists"),
            Self::NotAVideoLink { preview } => {
                write!(f, "❌ Not a YouTube link - ignored\n   Clipboard: {preview}")
            }
        }
    }
}

/// The JSON array of links on disk.
#[derive(Debug, Clone)]
pub struct LinkStore {
    path: PathBuf,
    links: Vec<String>,
}

impl LinkStore {
    /// A missing file is an empty list.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let links = match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json)
                .with_context(|| format!("{path:?} is not a JSON list of links"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{path:?} does not exist yet");
                vec![]
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {path:?}")),
        };

        Ok(Self {
            path: path.to_path_buf(),
            links,
        })
    }

    /// Written with four space indentation.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            dirs::ensure_dir(parent)?;
        }

        let mut buf = vec![];
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.links
            .serialize(&mut ser)
            .context("Failed to serialize links")?;

        trace!("Writing {} links to {:?}", self.links.len(), self.path);
        fs::write(&self.path, buf).with_context(|| format!("Failed to write {:?}", self.path))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Append `link` unless it is already there. Does not touch the file.
    pub fn add(&mut self, link: &str) -> AddOutcome {
        if self.links.iter().any(|l| l == link) {
            return AddOutcome::Duplicate;
        }

        self.links.push(link.to_string());
        AddOutcome::Added
    }

    /// Save `text` if it is a new video link, writing the file right away.
    ///
    /// The file is reloaded first so other writers are not overwritten.
    pub fn save_link(&mut self, text: &str) -> anyhow::Result<SaveOutcome> {
        let text = text.trim();

        if !is_video_link(text)? {
            return Ok(SaveOutcome::NotAVideoLink {
                preview: preview(text, PREVIEW_LENGTH),
            });
        }

        self.links = Self::load(&self.path)?.links;

        match self.add(text) {
            AddOutcome::Duplicate => Ok(SaveOutcome::AlreadyExists),
            AddOutcome::Added => {
                self.save()?;
                Ok(SaveOutcome::Saved {
                    link: text.to_string(),
                    total: self.len(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_video_links() {
        assert!(is_video_link("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap());
        assert!(is_video_link("https://youtu.be/dQw4w9WgXcQ").unwrap());
        assert!(!is_video_link("https://www.youtube.com/playlist?list=PL1").unwrap());
        assert!(!is_video_link("just some text").unwrap());
    }

    #[test]
    fn previews_are_cut_at_60_chars() {
        let long = "x".repeat(61);

        assert_eq!(preview("short", 60), "short");
        assert_eq!(preview(&"x".repeat(60), 60), "x".repeat(60));
        assert_eq!(preview(&long, 60), format!("{}...", "x".repeat(60)));
        assert_eq!(preview("ääää", 2), "ää...");
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();

        let store = LinkStore::load(&tmp.path().join("links.json")).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn broken_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.json");
        fs::write(&path, "{\"not\": \"a list\"}").unwrap();

        assert!(LinkStore::load(&path).is_err());
    }

    #[test]
    fn saves_with_four_space_indent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.json");
        let mut store = LinkStore::load(&path).unwrap();
        store.add("https://youtu.be/a");
        store.add("https://youtu.be/b");

        store.save().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[\n    \"https://youtu.be/a\",\n    \"https://youtu.be/b\"\n]"
        );
        assert_eq!(LinkStore::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn add_skips_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = LinkStore::load(&tmp.path().join("links.json")).unwrap();

        assert_eq!(store.add("https://youtu.be/a"), AddOutcome::Added);
        assert_eq!(store.add("https://youtu.be/a"), AddOutcome::Duplicate);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn save_link_outcomes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.json");
        let mut store = LinkStore::load(&path).unwrap();

        let saved = store.save_link("  https://youtu.be/a \n").unwrap();
        assert_eq!(
            saved,
            SaveOutcome::Saved {
                link: "https://youtu.be/a".into(),
                total: 1
            }
        );
        assert_eq!(
            saved.to_string(),
            "✓ Saved: https://youtu.be/a\n📊 Total links: 1"
        );

        assert_eq!(
            store.save_link("https://youtu.be/a").unwrap(),
            SaveOutcome::AlreadyExists
        );

        let ignored = store.save_link("hello").unwrap();
        assert_eq!(
            ignored.to_string(),
            "❌ Not a YouTube link - ignored\n   Clipboard: hello"
        );

        assert_eq!(LinkStore::load(&path).unwrap().links(), ["https://youtu.be/a"]);
    }

    #[test]
    fn save_link_keeps_links_written_by_others() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.json");
        let mut store = LinkStore::load(&path).unwrap();
        fs::write(&path, "[\"https://youtu.be/other\"]").unwrap();

        let outcome = store.save_link("https://youtu.be/mine").unwrap();

        assert!(matches!(outcome, SaveOutcome::Saved { total: 2, .. }));
    }
}
