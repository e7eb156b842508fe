//! `pkdb` command line.

use clap::{ColorChoice, Parser};
use pkdb_cli::logging::{LogConfig, LogFormat, init_logging};
use pkdb_cli::summary::print_summary;
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_doctor, run_normalize, run_pk, run_units};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match cli.command {
        Command::Normalize(args) => match run_normalize(&args) {
            Ok(state) => {
                print_summary(&state);
                if let Some(path) = &args.output {
                    println!("Output: {}", path.display());
                }
                if state.summary.rejected() > 0 { 1 } else { 0 }
            }
            Err(error) => report(&error),
        },
        Command::Pk(args) => match run_pk(&args) {
            Ok(run) => {
                print_summary(&run.state);
                println!("Output: {}", args.output_dir.display());
                for path in &run.written {
                    println!("  {}", path.display());
                }
                if run.state.summary.rejected() > 0 { 1 } else { 0 }
            }
            Err(error) => report(&error),
        },
        Command::Units(args) => match run_units(&args) {
            Ok(()) => 0,
            Err(error) => report(&error),
        },
        Command::Doctor(args) => match run_doctor(&args) {
            Ok(()) => 0,
            Err(error) => report(&error),
        },
    };
    std::process::exit(exit_code);
}

fn report(error: &anyhow::Error) -> i32 {
    eprintln!("error: {error:#}");
    1
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::default().with_level(cli.verbosity.tracing_level_filter());
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
