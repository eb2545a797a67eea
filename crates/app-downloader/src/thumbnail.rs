use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use app_logger::{debug, trace};
use reqwest::{blocking::Client, StatusCode};

const USER_AGENT: &str = concat!("vidshelf/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads episode thumbnails, reusing one HTTP client.
pub struct ThumbnailFetcher {
    client: Client,
}

impl ThumbnailFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .context("Failed to create the thumbnail HTTP client")?,
        })
    }

    /// Save the image at `url` to `path`.
    ///
    /// Only a `200 OK` with an image body is written.
    pub fn fetch(&self, url: &str, path: &Path) -> anyhow::Result<()> {
        debug!("Fetching thumbnail {url:?}");

        let res = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to request {url:?}"))?;

        if res.status() != StatusCode::OK {
            bail!("Thumbnail request returned {}", res.status());
        }

        let body = res.bytes().context("Failed to read thumbnail body")?;
        check_image(&body)?;

        trace!("Writing {} bytes to {path:?}", body.len());
        fs::write(path, &body).with_context(|| format!("Failed to write {path:?}"))?;

        Ok(())
    }
}

fn check_image(bytes: &[u8]) -> anyhow::Result<()> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(()),
        Some(kind) => bail!("Thumbnail is not an image but {}", kind.mime_type()),
        None => bail!("Thumbnail is not an image"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn fetcher_builds_its_client() {
        assert!(ThumbnailFetcher::new().is_ok());
        assert!(USER_AGENT.starts_with("vidshelf/"));
    }

    #[test]
    fn images_pass() {
        assert!(check_image(JPEG_HEADER).is_ok());
        assert!(check_image(PNG_HEADER).is_ok());
    }

    #[test]
    fn html_error_pages_are_rejected() {
        assert!(check_image(b"<!DOCTYPE html><html></html>").is_err());
        assert!(check_image(b"").is_err());
    }
}
