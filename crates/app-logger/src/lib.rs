use std::{env, fs, path::PathBuf};

pub use log::{debug, error, info, trace, warn, LevelFilter};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Logger, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use sanitize_filename::sanitize_with_options;

const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:<5} [{t}] {m}{n}";
const CONSOLE_PATTERN: &str = "{h({l:<5})} {m}{n}";

/// Dependencies that log a lot more than we care about.
const QUIET_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
    "want",
    "mio",
    "polling",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerConfigBuilder<'a> {
    config: LoggerConfig<'a>,
}

impl<'a> LoggerConfigBuilder<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn task_name(mut self, task_name: &'a str) -> Self {
        self.config.task_name = Some(task_name);
        self
    }

    #[must_use]
    pub fn program_name(mut self, program_name: &'a str) -> Self {
        self.config.program_name = Some(program_name);
        self
    }

    #[must_use]
    pub fn file_log_level(mut self, log_level: LevelFilter) -> Self {
        self.config.file_log_level = Some(log_level);
        self
    }

    #[must_use]
    pub fn console_log_level(mut self, log_level: LevelFilter) -> Self {
        self.config.console_log_level = Some(log_level);
        self
    }

    /// Map a `-v` count to a console level: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    #[must_use]
    pub fn verbosity(self, verbosity: u8) -> Self {
        self.console_log_level(level_for_verbosity(verbosity))
    }

    #[must_use]
    pub fn build(self) -> LoggerConfig<'a> {
        self.config
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerConfig<'a> {
    pub(crate) task_name: Option<&'a str>,
    pub(crate) program_name: Option<&'a str>,
    pub(crate) file_log_level: Option<LevelFilter>,
    pub(crate) console_log_level: Option<LevelFilter>,
}

impl<'a> From<LoggerConfigBuilder<'a>> for LoggerConfig<'a> {
    fn from(builder: LoggerConfigBuilder<'a>) -> Self {
        builder.build()
    }
}

impl LoggerConfig<'_> {
    #[must_use]
    pub fn builder() -> LoggerConfigBuilder<'static> {
        LoggerConfigBuilder::new()
    }
}

#[must_use]
pub const fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger: a log file in the temp dir plus console output on stderr.
///
/// stdout is left alone so task reports stay readable.
pub fn init<'a, T: Into<LoggerConfig<'a>>>(cfg: T) -> anyhow::Result<log4rs::Handle> {
    let cfg: LoggerConfig = cfg.into();

    let log_file = log_file_path(&cfg);
    fs::create_dir_all(log_file.parent().ok_or_else(|| {
        anyhow::anyhow!(
            "Failed to get parent directory of log file path: {:?}",
            &log_file
        )
    })?)?;

    let file_level = cfg.file_log_level.unwrap_or(LevelFilter::Debug);
    let console_level = cfg.console_log_level.unwrap_or(LevelFilter::Warn);

    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(&log_file)?;
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("logfile", Box::new(logfile)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(console_level)))
                .build("console", Box::new(console)),
        );

    let config = QUIET_TARGETS
        .iter()
        .fold(config, |config, target| {
            config.logger(Logger::builder().build(*target, LevelFilter::Error))
        })
        .build(
            Root::builder()
                .appender("logfile")
                .appender("console")
                .build(file_level.max(console_level)),
        )?;

    let handle = log4rs::init_config(config)?;

    debug!("Logging to {:?}", &log_file);

    Ok(handle)
}

fn log_file_path(config: &LoggerConfig) -> PathBuf {
    env::temp_dir().join(log_file_name(config))
}

fn log_file_name(config: &LoggerConfig) -> String {
    let mut name = config
        .program_name
        .unwrap_or(env!("CARGO_PKG_NAME"))
        .to_string();

    if let Some(task) = config.task_name {
        name = format!("{name}_{task}");
    }

    name.push_str(".log");

    sanitize_with_options(
        name,
        sanitize_filename::Options {
            truncate: true,
            replacement: "^",
            ..Default::default()
        },
    )
}
