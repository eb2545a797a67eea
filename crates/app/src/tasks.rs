//! One function per subcommand. Each returns a one line result for the final message.

use std::path::{Path, PathBuf};

use anyhow::bail;
use app_config::{Config, LinksCommand};
use app_helpers::{
    fs::{add_prefix, file_name_lossy, list_files_with_extensions},
    prompt,
};
use app_links::{LinkStore, SaveOutcome};
use app_logger::{debug, info};
use app_media::{
    compat::{check_files, FolderReport, TargetProfile},
    convert::Converter,
    interrupt,
    subtitles::{FileReport, SubtitleExtractor},
};

const RULE_WIDTH: usize = 70;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn print_check_report(report: &FolderReport) {
    println!("{}", rule());
    println!("🎬 Jellyfin Direct Play Compatibility Check");
    println!("{}", rule());

    for (file, result) in &report.files {
        let name = file_name_lossy(file);

        if result.passed {
            println!("✅ {name}");
        } else {
            println!("❌ {name}");
            for issue in &result.issues {
                println!("   ↳ {issue}");
            }
        }
    }

    println!("{}", rule());
    println!("✅ Direct Play Ready: {}", report.ready());
    println!("❌ Needs Fixing: {}", report.needs_fixing());
    println!("{}", rule());
}

pub fn check(config: &Config, folder: Option<&Path>) -> anyhow::Result<String> {
    let folder = folder.unwrap_or(config.checker.folder.as_path());

    if !folder.is_dir() {
        println!("❌ Folder not found: {}", folder.display());
        return Ok("nothing to check".into());
    }

    let files = list_files_with_extensions(folder, &config.checker.extensions)?;
    if files.is_empty() {
        println!("❌ No video files found");
        return Ok("nothing to check".into());
    }

    let report = check_files(
        config.dependencies.ffprobe()?,
        &files,
        &TargetProfile::direct_play(),
    );
    print_check_report(&report);

    Ok(format!(
        "{} ready, {} need fixing",
        report.ready(),
        report.needs_fixing()
    ))
}

pub fn convert(
    config: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    software: bool,
    backup_originals: bool,
) -> anyhow::Result<String> {
    let mut settings = config.converter.clone();
    if let Some(input) = input {
        settings.input_dir = input.to_path_buf();
    }
    if let Some(output) = output {
        settings.output_dir = output.to_path_buf();
    }
    settings.use_hardware_encoder &= !software;
    settings.backup_originals |= backup_originals;
    debug!("Converter settings: {settings:?}");

    if !settings.input_dir.is_dir() {
        println!("❌ Input folder not found: {}", settings.input_dir.display());
        return Ok("nothing to convert".into());
    }

    interrupt::install()?;
    let converter = Converter::new(
        config.dependencies.ffmpeg()?,
        config.dependencies.ffprobe()?,
        &settings,
    );
    let summary = converter.convert_and_collect(&settings.input_dir, &settings.output_dir)?;

    Ok(summary.to_string())
}

pub fn playlist(
    config: &Config,
    url: &str,
    no_convert: bool,
    size_check: bool,
) -> anyhow::Result<String> {
    let convert = config.playlist.convert_videos && !no_convert;
    let size_check = size_check || config.downloads.size_check;

    let report = app_downloader::playlist::download_playlist(config, url, convert, size_check)?;
    println!("{report}");

    Ok(report.to_string())
}

fn print_links(store: &LinkStore) {
    if store.is_empty() {
        println!("No saved links in {}", store.path().display());
        return;
    }

    for (i, link) in store.links().iter().enumerate() {
        println!("{:>3}. {link}", i + 1);
    }
    println!("📊 Total links: {}", store.len());
}

fn add_link(store: &mut LinkStore, url: &str) -> anyhow::Result<String> {
    let outcome = store.save_link(url)?;
    println!("{outcome}");

    match outcome {
        SaveOutcome::NotAVideoLink { .. } => bail!("{url:?} is not a YouTube video link"),
        SaveOutcome::Saved { total, .. } => Ok(format!("{total} saved links")),
        SaveOutcome::AlreadyExists => Ok(format!("{} saved links", store.len())),
    }
}

#[cfg(feature = "hotkey")]
fn listen_for_links(config: &Config, store: &mut LinkStore) -> anyhow::Result<String> {
    app_links::hotkey::listen(store, &config.links)?;

    Ok(format!("{} saved links", store.len()))
}

#[cfg(not(feature = "hotkey"))]
fn listen_for_links(_config: &Config, _store: &mut LinkStore) -> anyhow::Result<String> {
    bail!("vidshelf was built without the `hotkey` feature, use `links add` instead")
}

fn download_links(
    config: &Config,
    store: &LinkStore,
    convert: bool,
    size_check: bool,
) -> anyhow::Result<String> {
    if store.is_empty() {
        println!("No saved links in {}", store.path().display());
        return Ok("nothing to download".into());
    }

    let convert = convert || config.link_list.convert_videos;
    let size_check = size_check || config.downloads.size_check;
    info!("Downloading {} links", store.len());

    let report =
        app_downloader::links::download_links(config, store.links(), convert, size_check)?;
    println!("{report}");

    Ok(report.to_string())
}

pub fn links(config: &Config, command: &LinksCommand) -> anyhow::Result<String> {
    let mut store = LinkStore::load(&config.links_file())?;

    match command {
        LinksCommand::Save => listen_for_links(config, &mut store),
        LinksCommand::Add { url } => add_link(&mut store, url),
        LinksCommand::List => {
            print_links(&store);
            Ok(format!("{} saved links", store.len()))
        }
        LinksCommand::Download {
            convert,
            size_check,
        } => download_links(config, &store, *convert, *size_check),
    }
}

pub fn prefix(folder: &Path, prefix: &str, force: bool) -> anyhow::Result<String> {
    let renamed = add_prefix(folder, prefix, force)?;

    for path in &renamed {
        println!("{}", file_name_lossy(path));
    }

    Ok(format!("Renamed {} file(s)", renamed.len()))
}

fn print_subtitle_reports(reports: &[FileReport]) {
    println!("\n{}", "=".repeat(60));
    println!("Summary:");

    for report in reports {
        match (&report.result, report.elapsed) {
            (Ok(msg), Some(elapsed)) => {
                println!("✅ {} | {msg} | {}s", report.name, elapsed.as_secs());
            }
            (Ok(msg), None) => println!("✅ {} | {msg}", report.name),
            (Err(e), _) => println!("❌ {} | {e}", report.name),
        }
    }

    println!("{}", "=".repeat(60));
}

fn display_path(path: &Path) -> PathBuf {
    app_config::resolve_path(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn subtitles(
    config: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    subs: Option<&Path>,
    yes: bool,
    no_backup: bool,
) -> anyhow::Result<String> {
    let mut settings = config.subtitles.clone();
    if let Some(input) = input {
        settings.input_dir = input.to_path_buf();
    }
    if let Some(output) = output {
        settings.output_dir = output.to_path_buf();
    }
    if let Some(subs) = subs {
        settings.subs_dir = subs.to_path_buf();
    }
    settings.backup_originals &= !no_backup;

    println!(
        "This will extract embedded subtitles to .srt/.sup and remux videos without subtitle streams."
    );
    if !yes && !prompt::confirm("Continue?")? {
        println!("Aborted.");
        return Ok("aborted".into());
    }

    if !settings.input_dir.is_dir() {
        println!(
            "❌ Input folder '{}' not found. Create it and put videos there.",
            settings.input_dir.display()
        );
        return Ok("nothing to do".into());
    }

    let files = list_files_with_extensions(&settings.input_dir, &settings.extensions)?;
    if files.is_empty() {
        println!("No supported video files found in input folder.");
        return Ok("nothing to do".into());
    }

    let extractor = SubtitleExtractor::new(
        config.dependencies.ffmpeg()?,
        config.dependencies.ffprobe()?,
        &settings,
    );
    let reports = extractor.process_files(&files)?;
    print_subtitle_reports(&reports);

    println!(
        "Extracted subs saved to: {}",
        display_path(&settings.subs_dir).display()
    );
    println!(
        "Videos without subs saved to: {}",
        display_path(&settings.output_dir).display()
    );
    if let Some(backup_dir) = extractor.backup_dir() {
        println!("Originals moved to: {}", backup_dir.display());
    }

    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    Ok(format!("{} file(s) processed, {failed} failed", reports.len()))
}
