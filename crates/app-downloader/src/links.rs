//! Download a saved list of links straight into the videos folder.

use std::path::PathBuf;

use app_config::Config;
use app_helpers::{dirs, progress::items_bar};
use app_logger::debug;
use app_media::convert::{move_leftovers, Converter};

use crate::{
    common::{self, DownloadReport},
    yt_dlp::YtDlp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Downloaded,
    AlreadyExists,
}

struct LinkDownload<'a> {
    config: &'a Config,
    yt_dlp: YtDlp<'a>,
    converter: Option<Converter<'a>>,
    videos_dir: PathBuf,
}

impl LinkDownload<'_> {
    fn link(&self, url: &str) -> anyhow::Result<LinkOutcome> {
        let format = &self.config.link_list.format;

        let final_name = self.yt_dlp.final_filename(url, format, &self.videos_dir)?;
        if self.videos_dir.join(&final_name).exists() {
            println!("✅ Skipping (already exists): {final_name}");
            return Ok(LinkOutcome::AlreadyExists);
        }

        let work_dir = common::work_dir(&self.config.download_temp_dir())?;
        defer! {
            common::remove_work_dir(&work_dir);
        }
        self.yt_dlp.download_with_subtitles(url, format, &work_dir)?;

        let moved = match &self.converter {
            Some(converter) => {
                let convert_dir = common::work_dir(&self.config.convert_temp_dir())?;
                defer! {
                    common::remove_work_dir(&convert_dir);
                }
                converter.convert_and_collect(&work_dir, &convert_dir)?;
                move_leftovers(&convert_dir, &self.videos_dir)?
            }
            None => move_leftovers(&work_dir, &self.videos_dir)?,
        };
        debug!("Moved {moved:?}");

        Ok(LinkOutcome::Downloaded)
    }
}

/// Download every link that isn't in the videos folder yet.
pub fn download_links(
    config: &Config,
    links: &[String],
    convert: bool,
    size_check: bool,
) -> anyhow::Result<DownloadReport> {
    let yt_dlp = YtDlp::new(
        config.dependencies.yt_dlp()?,
        config.downloads.concurrent_fragments,
    );

    if size_check {
        common::print_total_size(&yt_dlp, links);
    }
    common::pause_if_asked(config)?;

    let videos_dir = config.videos_dir();
    dirs::ensure_dir(&videos_dir)?;

    let job = LinkDownload {
        config,
        yt_dlp,
        converter: common::converter(config, convert)?,
        videos_dir,
    };

    let mut report = DownloadReport::default();
    let overall = items_bar(links.len(), "Downloading Videos");
    for url in links {
        match job.link(url) {
            Ok(LinkOutcome::Downloaded) => report.downloaded += 1,
            Ok(LinkOutcome::AlreadyExists) => report.skipped += 1,
            Err(e) => report.fail(url.clone(), &e),
        }
        overall.inc(1);
    }
    overall.finish();

    Ok(report)
}
