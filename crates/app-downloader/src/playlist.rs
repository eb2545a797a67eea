//! A YouTube playlist as a TV show season.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use app_config::Config;
use app_helpers::{
    dirs,
    fs::{file_name_lossy, list_files_with_extensions, move_file},
    progress::items_bar,
};
use app_logger::{debug, info, warn};
use app_media::{artwork::ArtGenerator, convert::Converter};

use crate::{
    common::{self, DownloadReport},
    episode::{self, EpisodeInfo},
    thumbnail::ThumbnailFetcher,
    yt_dlp::{Playlist, PlaylistEntry, YtDlp},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Downloaded,
    AlreadyExists,
}

/// Move the downloaded files of one episode into the season folder as `<tag> <name>`.
pub fn move_episode_files(
    from: &Path,
    season_dir: &Path,
    tag: &str,
    extensions: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let files = list_files_with_extensions(from, extensions)?;
    let bar = items_bar(files.len(), "Moving Files");

    let moved = files
        .iter()
        .map(|file| {
            let dst = season_dir.join(episode::library_name(tag, &file_name_lossy(file)));
            bar.inc(1);
            move_file(file, &dst).map(|()| dst)
        })
        .collect();
    bar.finish_and_clear();

    moved
}

struct PlaylistDownload<'a> {
    config: &'a Config,
    yt_dlp: YtDlp<'a>,
    converter: Option<Converter<'a>>,
    thumbnails: Option<ThumbnailFetcher>,
    show_title: &'a str,
    season_dir: PathBuf,
}

impl PlaylistDownload<'_> {
    fn episode(&self, n: usize, entry: &PlaylistEntry) -> anyhow::Result<EntryOutcome> {
        let settings = &self.config.playlist;
        let tag = episode::episode_tag(settings.season, n);

        let Some(url) = entry.video_url() else {
            bail!("Playlist entry has no URL");
        };

        let download_temp = self.config.download_temp_dir();
        dirs::ensure_dir(&download_temp)?;
        let file_name = self
            .yt_dlp
            .final_filename(&url, &settings.format, &download_temp)?;
        let final_name = episode::library_name(&tag, &file_name);
        println!("{final_name}");

        if self.season_dir.join(&final_name).exists() {
            println!("✅ Skipping (already exists): {final_name}");
            return Ok(EntryOutcome::AlreadyExists);
        }

        let work_dir = common::work_dir(&download_temp)?;
        defer! {
            common::remove_work_dir(&work_dir);
        }
        self.yt_dlp
            .download_with_subtitles(&url, &settings.format, &work_dir)?;

        let mut extensions = self.config.downloads.video_extensions.clone();
        extensions.extend(self.config.downloads.subtitle_extensions.iter().cloned());

        match &self.converter {
            Some(converter) => {
                let convert_dir = common::work_dir(&self.config.convert_temp_dir())?;
                defer! {
                    common::remove_work_dir(&convert_dir);
                }
                converter.convert_and_collect(&work_dir, &convert_dir)?;
                move_episode_files(&convert_dir, &self.season_dir, &tag, &extensions)?;
            }
            None => {
                move_episode_files(&work_dir, &self.season_dir, &tag, &extensions)?;
            }
        }

        let nfo = EpisodeInfo {
            title: entry.title(),
            show_title: self.show_title,
            season: settings.season,
            episode: n,
            studio: entry.channel(),
        }
        .to_nfo();
        let nfo_path = self.season_dir.join(format!("{tag}.nfo"));
        fs::write(&nfo_path, nfo).with_context(|| format!("Failed to write {nfo_path:?}"))?;

        if let (Some(fetcher), Some(thumbnail)) = (&self.thumbnails, entry.best_thumbnail()) {
            let path = self.season_dir.join(format!("{tag}-thumb.jpg"));
            if let Err(e) = fetcher.fetch(thumbnail, &path) {
                warn!("Failed to save thumbnail for {tag}: {e:?}");
            }
        }

        Ok(EntryOutcome::Downloaded)
    }
}

fn write_show_nfo(videos_dir: &Path, playlist: &Playlist) -> anyhow::Result<PathBuf> {
    let path = videos_dir.join("tvshow.nfo");
    let nfo = episode::tvshow_nfo(
        playlist.title(),
        playlist.description.as_deref().unwrap_or_default(),
    );

    fs::write(&path, nfo).with_context(|| format!("Failed to write {path:?}"))?;

    Ok(path)
}

fn generate_art(config: &Config, season_dir: &Path) -> anyhow::Result<()> {
    let videos = list_files_with_extensions(season_dir, &config.downloads.video_extensions)?;
    if videos.is_empty() {
        println!("No videos found for art generation.");
        return Ok(());
    }

    println!("Generating art...");
    let generator = ArtGenerator {
        ffmpeg: config.dependencies.ffmpeg()?,
        ffprobe: config.dependencies.ffprobe()?,
    };
    let written = generator.generate(
        &videos,
        &config.videos_dir(),
        config.playlist.poster_count,
        config.playlist.fanart_count,
        &mut rand::thread_rng(),
    );
    info!("Generated {} art images", written.len());

    Ok(())
}

/// Download every video of the playlist at `url` as an episode of one season.
pub fn download_playlist(
    config: &Config,
    url: &str,
    convert: bool,
    size_check: bool,
) -> anyhow::Result<DownloadReport> {
    let yt_dlp = YtDlp::new(
        config.dependencies.yt_dlp()?,
        config.downloads.concurrent_fragments,
    );

    let playlist = yt_dlp.playlist(url)?;
    println!("{}", playlist.title());
    println!("{}", playlist.entries.len());

    if size_check {
        let urls = playlist
            .entries
            .iter()
            .filter_map(PlaylistEntry::video_url)
            .collect::<Vec<_>>();
        common::print_total_size(&yt_dlp, &urls);
    }
    common::pause_if_asked(config)?;

    let videos_dir = config.videos_dir();
    let season_dir = videos_dir.join(&config.playlist.season_folder);
    dirs::ensure_dir(&season_dir)?;

    let thumbnails = ThumbnailFetcher::new()
        .map_err(|e| warn!("Thumbnails are disabled: {e:?}"))
        .ok();

    let job = PlaylistDownload {
        config,
        yt_dlp,
        converter: common::converter(config, convert)?,
        thumbnails,
        show_title: playlist.title(),
        season_dir,
    };

    let mut report = DownloadReport::default();
    let overall = items_bar(playlist.entries.len(), "Downloading Videos");
    for (i, entry) in playlist.entries.iter().enumerate() {
        let n = i + 1;
        debug!("Episode {n}: {entry:?}");

        match job.episode(n, entry) {
            Ok(EntryOutcome::Downloaded) => report.downloaded += 1,
            Ok(EntryOutcome::AlreadyExists) => report.skipped += 1,
            Err(e) => report.fail(format!("Episode {n} ({})", entry.title()), &e),
        }
        overall.inc(1);
    }
    overall.finish();
    println!("\nDownload Finished...");

    write_show_nfo(&videos_dir, &playlist)?;

    println!("Generating video data...");
    if let Err(e) = generate_art(config, &job.season_dir) {
        warn!("Art generation failed: {e:?}");
    }

    Ok(report)
}
