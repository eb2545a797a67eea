use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};

pub use crate::{
    cli::{CliArgs, Command, DumpType, LinksCommand},
    common::{FolderConfig, ProgramPathConfig},
    settings::{
        CheckerConfig, ConverterConfig, DownloadConfig, HotkeyModifier, LinkListConfig,
        LinksConfig, PlaylistConfig, SubtitlesConfig,
    },
};
use crate::file::FileConfiguration;

mod cli;
mod common;
mod file;
mod settings;

pub static APPLICATION_NAME: &str = "vidshelf";
pub static ORGANIZATION_NAME: &str = "vidshelf";
pub static ORGANIZATION_QUALIFIER: &str = "net";

const DEFAULT_VIDEOS_DIR: &str = "videos";
const DEFAULT_DOWNLOAD_TEMP_DIR: &str = "download_temp";
const DEFAULT_CONVERT_TEMP_DIR: &str = "converted_videos";
const DEFAULT_LINKS_FILE: &str = "yt_links.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,

    #[serde(skip)]
    pub run: RunConfig,

    pub dependencies: ProgramPathConfig,

    pub folders: FolderConfig,

    pub checker: CheckerConfig,

    pub converter: ConverterConfig,

    pub downloads: DownloadConfig,

    pub playlist: PlaylistConfig,

    pub link_list: LinkListConfig,

    pub links: LinksConfig,

    pub subtitles: SubtitlesConfig,
}

impl Config {
    #[must_use]
    pub fn get_config_dir() -> Option<PathBuf> {
        Self::get_project_dir().map(|x| x.config_dir().into())
    }

    #[must_use]
    pub fn get_cache_dir() -> PathBuf {
        Self::get_project_dir().map_or_else(
            || env::temp_dir().join(APPLICATION_NAME),
            |x| x.cache_dir().into(),
        )
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        Self::get_cache_dir()
    }

    fn get_project_dir() -> Option<ProjectDirs> {
        ProjectDirs::from(ORGANIZATION_QUALIFIER, ORGANIZATION_NAME, APPLICATION_NAME)
    }

    /// Parse the command line, read the config file and merge the two.
    pub fn load() -> anyhow::Result<Self> {
        let args = CliArgs::parse();
        let (config_path, file_config) =
            FileConfiguration::new(args.app.config_path.as_deref())?;

        let mut config = Self::from_parts(file_config, &args)?;
        config.app.config_path = config_path;

        Ok(config)
    }

    fn from_parts(file_config: FileConfiguration, args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = Self::default();

        file_config.merge_into_config(&mut config);
        args.merge_into_config(&mut config);

        config.dependencies.search_path();
        config.resolve_folders()?;

        Ok(config)
    }

    fn resolve_folders(&mut self) -> anyhow::Result<()> {
        let folders = &mut self.folders;

        folders.videos_dir = Some(resolve(
            folders.videos_dir.as_deref(),
            DEFAULT_VIDEOS_DIR,
        )?);
        folders.download_temp_dir = Some(resolve(
            folders.download_temp_dir.as_deref(),
            DEFAULT_DOWNLOAD_TEMP_DIR,
        )?);
        folders.convert_temp_dir = Some(resolve(
            folders.convert_temp_dir.as_deref(),
            DEFAULT_CONVERT_TEMP_DIR,
        )?);
        folders.links_file = Some(resolve(
            folders.links_file.as_deref(),
            DEFAULT_LINKS_FILE,
        )?);

        Ok(())
    }

    #[must_use]
    pub fn videos_dir(&self) -> PathBuf {
        self.folders
            .videos_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_VIDEOS_DIR.into())
    }

    #[must_use]
    pub fn download_temp_dir(&self) -> PathBuf {
        self.folders
            .download_temp_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_TEMP_DIR.into())
    }

    #[must_use]
    pub fn convert_temp_dir(&self) -> PathBuf {
        self.folders
            .convert_temp_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_CONVERT_TEMP_DIR.into())
    }

    #[must_use]
    pub fn links_file(&self) -> PathBuf {
        self.folders
            .links_file
            .clone()
            .unwrap_or_else(|| DEFAULT_LINKS_FILE.into())
    }

    pub fn dump(&self, dump_type: DumpType) -> anyhow::Result<String> {
        match dump_type {
            DumpType::Toml => {
                toml::to_string_pretty(self).context("Failed to serialize config as TOML")
            }
            DumpType::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize config as JSON")
            }
        }
    }
}

/// Make a configured path absolute, expanding `~`.
pub fn resolve_path(path: &Path) -> anyhow::Result<PathBuf> {
    let resolved = path
        .try_resolve()
        .with_context(|| format!("Failed to resolve path {path:?}"))?;

    Ok(resolved.into_owned())
}

fn resolve(path: Option<&Path>, default: &str) -> anyhow::Result<PathBuf> {
    resolve_path(path.unwrap_or_else(|| Path::new(default)))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub config_path: PathBuf,

    #[serde(skip)]
    pub verbosity: u8,
}

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub command: Option<Command>,
    pub dump_config: Option<DumpType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(file: &str, args: &[&str]) -> Config {
        let file_config = FileConfiguration::parse(file).unwrap();
        let args = CliArgs::try_parse_from(args).unwrap();

        Config::from_parts(file_config, &args).unwrap()
    }

    #[test]
    fn defaults_are_resolved_to_absolute_paths() {
        let config = config_from("", &["vidshelf", "links", "list"]);

        assert!(config.videos_dir().is_absolute());
        assert!(config.videos_dir().ends_with("videos"));
        assert!(config.links_file().ends_with("yt_links.json"));
        assert_eq!(config.converter.crf, 18);
    }

    #[test]
    fn arguments_win_over_the_config_file() {
        let config = config_from(
            "[folders]\nvideos_dir = \"/srv/from-file\"\nlinks_file = \"/srv/links.json\"\n",
            &["vidshelf", "--videos-dir", "/srv/from-args", "links", "list"],
        );

        assert_eq!(config.videos_dir(), PathBuf::from("/srv/from-args"));
        assert_eq!(config.links_file(), PathBuf::from("/srv/links.json"));
    }

    #[test]
    fn dumps_as_toml_and_json() {
        let config = config_from("[converter]\ncrf = 21\n", &["vidshelf"]);

        let toml = config.dump(DumpType::Toml).unwrap();
        assert!(toml.contains("crf = 21"));

        let json = config.dump(DumpType::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["converter"]["crf"], 21);
    }
}
