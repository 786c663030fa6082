use std::path::PathBuf;
use std::sync::LazyLock;

use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use ogv::process::OpenOptions;
use ogv::process::sync::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} ({}, ogv {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("untracked"),
        env!("OGV_VERSION"),
        env!("BUILD_TIMESTAMP"),
    )
});

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION.as_str(),
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting Ogg Theora video files",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (checksum failures, lost header pages).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Bytes requested from the input per read.
    #[arg(
        long,
        global = true,
        value_name = "BYTES",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_CHUNK_SIZE as u64),
    )]
    pub chunk_size: usize,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::default()
            .strict(self.strict)
            .read_chunk_size(self.chunk_size)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print stream information
    Info(InfoArgs),

    /// List the content packets of the video stream.
    Packets(PacketsArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input Ogg file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Print the report as YAML.
    #[arg(long)]
    pub yaml: bool,
}

#[derive(Debug, Args)]
pub struct PacketsArgs {
    /// Input Ogg file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Stop after this many packets.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[test]
fn chunk_size_bounds() {
    let cli = Cli::try_parse_from(["ogvd", "--chunk-size", "4096", "info", "a.ogv"]).unwrap();
    assert_eq!(cli.chunk_size, 4096);
    assert_eq!(cli.open_options().read_chunk_size, 4096);

    let cli = Cli::try_parse_from(["ogvd", "packets", "a.ogv"]).unwrap();
    assert_eq!(cli.chunk_size, DEFAULT_CHUNK_SIZE);

    for size in ["0", "18446744073709551615"] {
        assert!(Cli::try_parse_from(["ogvd", "--chunk-size", size, "info", "a.ogv"]).is_err());
    }
}
