use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use serde::{Deserialize, Serialize};

use crate::{
    common::{FolderConfig, ProgramPathConfig},
    Config,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "vidshelf", version, about)]
pub struct CliArgs {
    #[command(flatten)]
    pub app: AppArgs,

    #[command(flatten, next_help_heading = Some("Program paths"))]
    pub paths: ProgramPathConfig,

    #[command(flatten, next_help_heading = Some("Folders"))]
    pub folders: FolderConfig,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    pub(crate) fn merge_into_config(&self, config: &mut Config) {
        config.dependencies.merge(&self.paths);
        config.folders.merge(&self.folders);

        if let Some(config_path) = &self.app.config_path {
            config.app.config_path = config_path.into();
        }
        config.app.verbosity = self.app.verbose;

        config.run.command = self.command.clone();
        config.run.dump_config = self
            .app
            .dump_config
            .clone()
            .map(|x| x.unwrap_or(DumpType::Toml));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum DumpType {
    Toml,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct AppArgs {
    #[arg(short='c', long, global = true, default_value = None, env = "VIDSHELF_CONFIG", value_hint = ValueHint::FilePath)]
    /// Location of the configuration file.
    ///
    /// By default it lives in the os-appropriate config directory
    /// under the name `vidshelf/config.toml'
    pub config_path: Option<PathBuf>,

    #[arg(long, ignore_case = true, value_name = "FORMAT")]
    /// Dump the configuration to stdout and exit.
    ///
    /// Useful for debugging.
    /// When dumped with the `toml` format, can be used as a config file.
    #[allow(clippy::option_option)]
    pub dump_config: Option<Option<DumpType>>,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    /// Print more diagnostics to stderr. Repeat for more.
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Report which videos in a folder can be direct played.
    Check {
        #[arg(value_hint = ValueHint::DirPath)]
        /// Folder to scan. Defaults to `checker.folder' from the config.
        folder: Option<PathBuf>,
    },

    /// Convert videos into direct-play friendly H.264/AAC MP4 files.
    Convert {
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        input: Option<PathBuf>,

        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,

        #[arg(long)]
        /// Never use a hardware encoder.
        software: bool,

        #[arg(long)]
        /// Keep converted originals in `<input>/originals_backup'.
        backup_originals: bool,
    },

    /// Download a playlist into the library as a season of a TV show.
    Playlist {
        #[arg(value_hint = ValueHint::Url)]
        url: String,

        #[arg(long)]
        /// Keep the downloaded files as they are.
        no_convert: bool,

        #[arg(long)]
        /// Print the total download size first.
        size_check: bool,
    },

    /// Save links and download them later.
    #[command(subcommand)]
    Links(LinksCommand),

    /// Prepend a prefix to every file name in a folder.
    Prefix {
        #[arg(value_hint = ValueHint::DirPath)]
        folder: PathBuf,

        prefix: String,

        #[arg(long)]
        /// Also rename files that already start with the prefix.
        force: bool,
    },

    /// Extract embedded subtitles and remux the videos without them.
    Subtitles {
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        input: Option<PathBuf>,

        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,

        #[arg(short, long, value_hint = ValueHint::DirPath)]
        /// Where extracted subtitle files go.
        subs: Option<PathBuf>,

        #[arg(short, long)]
        /// Don't ask for confirmation.
        yes: bool,

        #[arg(long)]
        /// Leave the originals where they are.
        no_backup: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum LinksCommand {
    /// Listen for the hotkey and save the clipboard when it is pressed.
    Save,

    /// Save a single link.
    Add {
        #[arg(value_hint = ValueHint::Url)]
        url: String,
    },

    /// Print the saved links.
    List,

    /// Download every saved link into the library.
    Download {
        #[arg(long)]
        /// Convert the downloads before moving them into the library.
        convert: bool,

        #[arg(long)]
        /// Print the total download size first.
        size_check: bool,
    },
}

impl Command {
    /// Short name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Check { .. } => "check",
            Self::Convert { .. } => "convert",
            Self::Playlist { .. } => "playlist",
            Self::Links(LinksCommand::Save) => "links-save",
            Self::Links(LinksCommand::Add { .. }) => "links-add",
            Self::Links(LinksCommand::List) => "links-list",
            Self::Links(LinksCommand::Download { .. }) => "links-download",
            Self::Prefix { .. } => "prefix",
            Self::Subtitles { .. } => "subtitles",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "vidshelf",
            "convert",
            "--input",
            "in",
            "--ffmpeg-path",
            "/opt/ffmpeg",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.paths.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(args.app.verbose, 2);
        match args.command {
            Some(Command::Convert { input, output, .. }) => {
                assert_eq!(input, Some(PathBuf::from("in")));
                assert_eq!(output, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn links_subcommands_parse() {
        let args = CliArgs::try_parse_from(["vidshelf", "links", "add", "https://youtu.be/x"])
            .unwrap();

        let command = args.command.unwrap();
        assert_eq!(command.name(), "links-add");
    }

    #[test]
    fn dump_config_defaults_to_toml() {
        let args = CliArgs::try_parse_from(["vidshelf", "--dump-config"]).unwrap();
        let mut config = Config::default();

        args.merge_into_config(&mut config);

        assert_eq!(config.run.dump_config, Some(DumpType::Toml));
        assert!(config.run.command.is_none());
    }
}
