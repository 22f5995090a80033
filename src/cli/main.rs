//! Command-line interface entry point for `plantracker`

mod args;
mod commands;

use args::{Cli, Command};
use clap::Parser;
use plan_tracker::config::{Config, ConfigOverrides};
use plan_tracker::info;
use plan_tracker::logger::{enable_debug, enable_verbose, init_file_logging, set_level, Level};

fn main() {
    let args = Cli::parse();

    // Environment overrides first, then CLI flags on top
    let mut config = Config::load();
    let defaults = Config::from_defaults();
    config.apply_overrides(&ConfigOverrides::from_env());
    config.apply_overrides(&args.to_config_overrides());

    // CLI flag overrides config logging.level; fallback warn
    let mut level = args
        .log_level
        .map(std::convert::Into::into)
        .or_else(|| Level::parse(&config.logging.level))
        .unwrap_or(Level::Warn);

    if args.debug_flag || level == Level::Debug {
        level = Level::Debug;
        enable_debug();
    }

    let verbose = args.verbose || config.logging.verbose;
    if verbose {
        enable_verbose();
    }
    set_level(level);

    // CLI flag wins, otherwise config logging.file if set
    let config_log_path = Some(config.logging.file.trim())
        .filter(|f| !f.is_empty())
        .map(std::path::PathBuf::from);

    if let Some(log_path) = args.log_file.as_ref().or(config_log_path.as_ref()) {
        let display_path = log_path.to_string_lossy();
        if init_file_logging(log_path) {
            if verbose {
                eprintln!("✓ File logging initialized at: {display_path}");
            } else {
                info!("File logging initialized at: {display_path}");
            }
        } else {
            eprintln!("✗ Failed to initialize file logging at: {display_path}");
        }
    }

    if let Err(e) = run(args.command, &mut config, &defaults) {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

fn run(command: Command, config: &mut Config, defaults: &Config) -> commands::CommandResult {
    match command {
        Command::Config { subcommand } => commands::config::run(subcommand, config, defaults),
        Command::Backend => {
            commands::state::backend(config);
            Ok(())
        }
        Command::Enrollment { student } => {
            commands::state::enrollment(&commands::open_sync(config)?, &student);
            Ok(())
        }
        Command::Load { student, output } => {
            commands::state::load(&commands::open_sync(config)?, &student, output.as_deref())
        }
        Command::Save { student, input } => {
            commands::state::save(&commands::open_sync(config)?, &student, &input)
        }
        Command::Register {
            student,
            track,
            capstone,
        } => commands::state::register(&commands::open_sync(config)?, &student, track, capstone),
        Command::Progress { student, json, .. } => {
            commands::progress::run(&commands::open_sync(config)?, &student, config, json)
        }
    }
}
