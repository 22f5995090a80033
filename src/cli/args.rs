//! CLI argument definitions for `plantracker`

use clap::{builder::BoolishValueParser, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use plan_tracker::config::ConfigOverrides;
use plan_tracker::logger::Level;

/// CLI log level argument
///
/// Converts to lowercase strings for config storage and to [`Level`] for
/// runtime use.
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevelArg {
    /// Error-level logging
    Error,
    /// Warning-level logging
    Warn,
    /// Info-level logging
    Info,
    /// Debug-level logging
    Debug,
}

impl From<LogLevelArg> for Level {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => Self::Error,
            LogLevelArg::Warn => Self::Warn,
            LogLevelArg::Info => Self::Info,
            LogLevelArg::Debug => Self::Debug,
        }
    }
}

impl std::fmt::Display for LogLevelArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let as_str = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        write!(f, "{as_str}")
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Display configuration values.
    ///
    /// If a KEY is provided, displays only that configuration value.
    /// If no KEY is provided, displays all configuration values.
    Get {
        /// Optional configuration key to display (e.g., `level`, `remote_url`, `plan_id`)
        #[arg(value_name = "KEY")]
        key: Option<String>,
    },
    /// Set a configuration value.
    Set {
        /// Configuration key to set
        #[arg(value_name = "KEY")]
        key: String,
        /// Value to set
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Unset a configuration value.
    Unset {
        /// Configuration key to unset
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Reset configuration to defaults (requires confirmation).
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    ///
    /// If no subcommand is provided, displays all configuration values.
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
    /// Show which storage backend is active.
    Backend,
    /// Show which plan a student has saved state for.
    Enrollment {
        /// Student identifier
        #[arg(value_name = "STUDENT")]
        student: String,
    },
    /// Load a student's plan map as JSON.
    Load {
        /// Student identifier
        #[arg(value_name = "STUDENT")]
        student: String,

        /// Write the plan map to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Save a plan map (JSON) for a student.
    Save {
        /// Student identifier
        #[arg(value_name = "STUDENT")]
        student: String,

        /// Plan map JSON file (`-` reads stdin)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Register a student for the configured plan without changing saved courses.
    Register {
        /// Student identifier
        #[arg(value_name = "STUDENT")]
        student: String,

        /// Orientation or track within the plan
        #[arg(long, value_name = "TRACK")]
        track: Option<String>,

        /// Capstone track (thesis or final project)
        #[arg(long, value_name = "TRACK")]
        capstone: Option<String>,
    },
    /// Show progress statistics for a student.
    Progress {
        /// Student identifier
        #[arg(value_name = "STUDENT")]
        student: String,

        /// Degree plan catalog (TOML); defaults to config `catalog`, then the built-in plan
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "plantracker",
    about = "Degree plan progress tracker",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Set the runtime log level (error|warn|info|debug). Falls back to config if omitted.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Enable verbose output (runtime only)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable debug-level logging and runtime debug flag (shorthand)
    #[arg(long = "debug")]
    pub debug_flag: bool,

    /// Write runtime logs to a file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    // --- Config overrides ---
    /// Override config logging level
    #[arg(long = "config-level", value_enum)]
    pub config_level: Option<LogLevelArg>,

    /// Override config log file path
    #[arg(long = "config-log-file", value_name = "PATH")]
    pub config_log_file: Option<PathBuf>,

    /// Override config verbose flag (true/false)
    #[arg(long = "config-verbose", value_parser = BoolishValueParser::new())]
    pub config_verbose: Option<bool>,

    /// Use the local store only, even when remote credentials are configured
    #[arg(long)]
    pub offline: bool,

    /// Override the local store directory
    #[arg(long, value_name = "DIR")]
    pub local_dir: Option<PathBuf>,

    /// Override the remote store URL
    #[arg(long, value_name = "URL")]
    pub remote_url: Option<String>,

    /// Override the remote store key
    #[arg(long, value_name = "KEY")]
    pub remote_key: Option<String>,

    /// Subcommand to execute.
    /// A subcommand is required to run the CLI.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Convert CLI flags into config overrides
    ///
    /// `None` means no override. `--offline` can only turn offline mode on.
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            level: self.config_level.map(|lvl| lvl.to_string()),
            file: self
                .config_log_file
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            verbose: self.config_verbose,
            offline: self.offline.then_some(true),
            local_dir: self
                .local_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            remote_url: self.remote_url.clone(),
            remote_key: self.remote_key.clone(),
            catalog_path: match &self.command {
                Command::Progress {
                    catalog: Some(path),
                    ..
                } => Some(path.to_string_lossy().to_string()),
                _ => None,
            },
        }
    }
}
