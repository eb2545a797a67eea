use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::{
    common::{FolderConfig, ProgramPathConfig},
    settings::{
        CheckerConfig, ConverterConfig, DownloadConfig, LinkListConfig, LinksConfig,
        PlaylistConfig, SubtitlesConfig,
    },
    Config,
};

const DEFAULT_CONFIG_FILE: &str = include_str!("./config.toml");

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FileConfiguration {
    pub dependencies: Option<ProgramPathConfig>,

    pub folders: Option<FolderConfig>,

    pub checker: Option<CheckerConfig>,

    pub converter: Option<ConverterConfig>,

    pub downloads: Option<DownloadConfig>,

    pub playlist: Option<PlaylistConfig>,

    pub link_list: Option<LinkListConfig>,

    pub links: Option<LinksConfig>,

    pub subtitles: Option<SubtitlesConfig>,
}

impl FileConfiguration {
    /// Load the given config file, or the default one (creating it if needed).
    pub(crate) fn new(config_path: Option<&Path>) -> anyhow::Result<(PathBuf, Self)> {
        let config_path = match config_path {
            Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
            _ => Self::create_default_config_file()?,
        };

        let config = Self::load_from_file(&config_path)?;

        Ok((config_path, config))
    }

    pub(crate) fn merge_into_config(self, config: &mut Config) {
        if let Some(dependencies) = &self.dependencies {
            config.dependencies.merge(dependencies);
        }

        if let Some(folders) = &self.folders {
            config.folders.merge(folders);
        }

        if let Some(checker) = self.checker {
            config.checker = checker;
        }

        if let Some(converter) = self.converter {
            config.converter = converter;
        }

        if let Some(downloads) = self.downloads {
            config.downloads = downloads;
        }

        if let Some(playlist) = self.playlist {
            config.playlist = playlist;
        }

        if let Some(link_list) = self.link_list {
            config.link_list = link_list;
        }

        if let Some(links) = self.links {
            config.links = links;
        }

        if let Some(subtitles) = self.subtitles {
            config.subtitles = subtitles;
        }
    }

    pub(crate) fn load_from_file<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let p = path.as_ref();

        if !p.is_file() {
            anyhow::bail!("Config file {:?} does not exist or is not a file", &p);
        }

        let contents =
            fs::read_to_string(p).with_context(|| format!("Failed to read config file {p:?}"))?;

        Self::parse(&contents).with_context(|| format!("Error parsing config file {p:?}"))
    }

    pub(crate) fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str::<Self>(contents)?)
    }

    fn create_default_config_file() -> anyhow::Result<PathBuf> {
        let file = Config::get_config_dir()
            .map(|x| x.join("config.toml"))
            .ok_or_else(|| {
                anyhow!(
                    "Failed to get config directory. Please pass a config file with --config or \
                     the VIDSHELF_CONFIG environment variable"
                )
            })?;

        let config_dir = file.parent().ok_or_else(|| {
            anyhow!("Failed to get parent directory of config file. Is the config file in root?")
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create config directory {config_dir:?}"))?;
        }

        if !file.exists() {
            eprintln!("Config file not found. Creating one at {file:?}");
            fs::write(&file, DEFAULT_CONFIG_FILE)
                .with_context(|| format!("Failed to create config file {file:?}"))?;
        }

        Ok(file)
    }
}
