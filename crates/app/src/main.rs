use std::process::exit;

use app_config::{Command, Config, APPLICATION_NAME};
use app_logger::{error, info, trace, LoggerConfig};

#[cfg(feature = "desktop-notifications")]
mod notif;
mod tasks;

fn run(config: &Config, command: &Command) -> anyhow::Result<String> {
    match command {
        Command::Check { folder } => tasks::check(config, folder.as_deref()),
        Command::Convert {
            input,
            output,
            software,
            backup_originals,
        } => tasks::convert(
            config,
            input.as_deref(),
            output.as_deref(),
            *software,
            *backup_originals,
        ),
        Command::Playlist {
            url,
            no_convert,
            size_check,
        } => tasks::playlist(config, url, *no_convert, *size_check),
        Command::Links(links) => tasks::links(config, links),
        Command::Prefix {
            folder,
            prefix,
            force,
        } => tasks::prefix(folder, prefix, *force),
        Command::Subtitles {
            input,
            output,
            subs,
            yes,
            no_backup,
        } => tasks::subtitles(
            config,
            input.as_deref(),
            output.as_deref(),
            subs.as_deref(),
            *yes,
            *no_backup,
        ),
    }
}

/// Tasks that run long enough for a desktop notification to be useful.
#[cfg(feature = "desktop-notifications")]
const fn worth_notifying(command: &Command) -> bool {
    matches!(
        command,
        Command::Convert { .. }
            | Command::Playlist { .. }
            | Command::Links(app_config::LinksCommand::Download { .. })
            | Command::Subtitles { .. }
    )
}

fn main() {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load the configuration: {e:?}");
        exit(1);
    });

    if let Some(dump_type) = config.run.dump_config {
        match config.dump(dump_type) {
            Ok(dump) => {
                println!("{dump}");
                exit(0);
            }
            Err(e) => {
                eprintln!("{e:?}");
                exit(1);
            }
        }
    }

    let Some(command) = config.run.command.clone() else {
        eprintln!("No task given. Run `{APPLICATION_NAME} --help` to see the available tasks.");
        exit(2);
    };

    if app_logger::init(
        LoggerConfig::builder()
            .program_name(APPLICATION_NAME)
            .task_name(command.name())
            .verbosity(config.app.verbosity),
    )
    .is_err()
    {
        eprintln!("Failed to initialize logger.");
        exit(1);
    }

    trace!("Config: {config:?}");
    info!("Running {}", command.name());

    let result = run(&config, &command);

    #[cfg(feature = "desktop-notifications")]
    {
        if worth_notifying(&command) {
            notif::task_finished(command.name(), &result);
        }
    }

    match result {
        Ok(message) => info!("{} done: {message}", command.name()),
        Err(e) => {
            error!("{} failed: {e:?}", command.name());
            exit(1);
        }
    }
}
