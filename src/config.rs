// src/config.rs
use crate::error::{PreviewError, Result};
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DEBOUNCE_MS: u64 = 50;
const DEFAULT_KEEP_ALIVE_MS: u64 = 15_000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for the application.
#[derive(Parser, Debug, Default)]
#[clap(
    author,
    version,
    about,
    long_about = None,
    after_help = "Without FILE, markdown is read from stdin. -w needs a FILE and implies -s.\n\
                  Without -s or -w the rendered HTML is written to stdout."
)]
pub struct CliArgs {
    /// Open the output in your browser
    #[clap(short, long)]
    pub serve: bool,

    /// Open the output in a browser and reload it whenever FILE changes
    #[clap(short, long)]
    pub watch: bool,

    /// Print debugging information
    #[clap(short, long)]
    pub verbose: bool,

    /// Path to a configuration file (default: mdpreview.toml)
    #[clap(short, long, value_parser)]
    pub config: Option<PathBuf>,

    /// Log level (e.g., trace, debug, info, warn, error)
    #[clap(long, value_parser)]
    pub log_level: Option<String>,

    /// Quiescence window in milliseconds before a change is re-rendered
    #[clap(long, value_parser)]
    pub debounce_ms: Option<u64>,

    /// Markdown file to render
    pub file: Option<PathBuf>,
}

/// Settings that can come from the config file or `MDPREVIEW_*` variables.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct FileConfig {
    pub debounce_ms: Option<u64>,
    pub keep_alive_ms: Option<u64>,
    /// Command used to open a URL or file, e.g. "xdg-open" or "firefox --new-tab"
    pub open_command: Option<String>,
    /// Where serve mode writes the page
    pub temp_file: Option<PathBuf>,
    /// Explicit path to the pygmentize executable
    pub pygmentize: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// What to do with the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write the HTML body to stdout.
    Stdout,
    /// Write a full page to the temp file and open it.
    Serve,
    /// Serve the page locally and push reloads as the file changes.
    Watch,
}

/// Final application configuration after merging all sources.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: Mode,
    /// Input document; `None` means stdin.
    pub file: Option<PathBuf>,
    pub verbose: bool,
    pub debounce: Duration,
    pub keep_alive: Duration,
    pub open_command: String,
    pub temp_file: PathBuf,
    pub pygmentize: Option<PathBuf>,
    pub log_level: String,
}

/// Platform command for opening URLs and files.
pub fn default_open_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    }
}

impl AppConfig {
    /// Merges defaults, the TOML file, the environment and `cli`.
    pub fn load(cli: CliArgs) -> Result<Self> {
        let config_file_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("mdpreview.toml"));

        let file_config: FileConfig = Figment::new()
            .merge(Serialized::defaults(FileConfig {
                debounce_ms: Some(DEFAULT_DEBOUNCE_MS),
                keep_alive_ms: Some(DEFAULT_KEEP_ALIVE_MS),
                log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
                ..Default::default()
            }))
            .merge(Toml::file(config_file_path).nested())
            .merge(Env::prefixed("MDPREVIEW_").global())
            .select("mdpreview")
            .extract()?;

        Self::from_parts(cli, file_config)
    }

    /// Validates the flag combination and applies CLI overrides on top of
    /// `file_config`.
    ///
    /// # Errors
    /// [`PreviewError::Usage`] when `-w` is given without a file.
    pub fn from_parts(cli: CliArgs, file_config: FileConfig) -> Result<Self> {
        if cli.watch && cli.file.is_none() {
            return Err(PreviewError::Usage(
                "-w requires a FILE argument; stdin cannot be watched".to_string(),
            ));
        }

        let mode = if cli.watch {
            Mode::Watch
        } else if cli.serve {
            Mode::Serve
        } else {
            Mode::Stdout
        };

        let log_level = if cli.verbose {
            "debug".to_string()
        } else {
            cli.log_level
                .or(file_config.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };

        let debounce_ms = cli
            .debounce_ms
            .or(file_config.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        let keep_alive_ms = file_config
            .keep_alive_ms
            .unwrap_or(DEFAULT_KEEP_ALIVE_MS)
            .max(1);

        Ok(AppConfig {
            mode,
            file: cli.file,
            verbose: cli.verbose,
            debounce: Duration::from_millis(debounce_ms),
            keep_alive: Duration::from_millis(keep_alive_ms),
            open_command: file_config
                .open_command
                .unwrap_or_else(|| default_open_command().to_string()),
            temp_file: file_config
                .temp_file
                .unwrap_or_else(|| std::env::temp_dir().join("mdpreview.html")),
            pygmentize: file_config.pygmentize,
            log_level,
        })
    }
}
