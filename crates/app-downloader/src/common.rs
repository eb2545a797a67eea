use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use app_config::Config;
use app_helpers::{dirs, progress::items_bar, prompt};
use app_logger::{debug, trace, warn};
use app_media::convert::Converter;

use crate::yt_dlp::YtDlp;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

impl DownloadReport {
    pub(crate) fn fail(&mut self, what: String, e: &anyhow::Error) {
        warn!("Downloading {what:?} failed: {e:?}");
        println!("❌ {what}: {e:#}");
        self.failed.push((what, format!("{e:#}")));
    }
}

impl fmt::Display for DownloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Downloaded {}, skipped {}, failed {}",
            self.downloaded,
            self.skipped,
            self.failed.len()
        )
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn format_gib(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

/// Sum up the estimated sizes, printing the total. Unknown sizes count as 0.
pub fn print_total_size(yt_dlp: &YtDlp<'_>, urls: &[String]) -> u64 {
    let bar = items_bar(urls.len(), "Checking File Size");

    let total = urls
        .iter()
        .map(|url| {
            let size = yt_dlp.size(url).unwrap_or_else(|e| {
                warn!("Failed to get the size of {url:?}: {e:?}");
                0
            });
            bar.inc(1);
            size
        })
        .sum();
    bar.finish_and_clear();

    println!("\nTotal size: {}", format_gib(total));

    total
}

pub fn pause_if_asked(config: &Config) -> anyhow::Result<()> {
    if config.downloads.ask_before_download {
        prompt::wait_for_enter("Press enter to continue: ")?;
    }

    Ok(())
}

/// The converter, built once per run when conversion is on.
pub fn converter(config: &Config, convert: bool) -> anyhow::Result<Option<Converter<'_>>> {
    if !convert {
        return Ok(None);
    }

    Ok(Some(Converter::new(
        config.dependencies.ffmpeg()?,
        config.dependencies.ffprobe()?,
        &config.converter,
    )))
}

pub fn remove_work_dir(dir: &Path) {
    trace!("Deleting {dir:?}");
    if let Err(e) = fs::remove_dir_all(dir) {
        debug!("Failed to delete {dir:?}: {e:?}");
    }
}

/// A fresh folder per download so leftovers of earlier runs never get picked up.
pub fn work_dir(parent: &Path) -> anyhow::Result<PathBuf> {
    dirs::ensure_dir(parent)?;
    dirs::create_work_dir(parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gib_formatting() {
        assert_eq!(format_gib(0), "0.00 GB");
        assert_eq!(format_gib(1024 * 1024 * 1024 * 3 / 2), "1.50 GB");
    }

    #[test]
    fn report_line() {
        let mut report = DownloadReport {
            downloaded: 3,
            skipped: 2,
            ..DownloadReport::default()
        };
        report.fail("x".into(), &anyhow::anyhow!("boom"));

        assert_eq!(report.to_string(), "Downloaded 3, skipped 2, failed 1");
        assert_eq!(report.failed[0], ("x".to_string(), "boom".to_string()));
    }
}
