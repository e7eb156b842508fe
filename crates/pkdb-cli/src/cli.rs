//! CLI argument definitions for `pkdb`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use pkdb_model::{MeasurementKind, NormalizationOptions};

#[derive(Parser)]
#[command(
    name = "pkdb",
    version,
    about = "Normalize pharmacokinetic study data and derive PK inputs",
    long_about = "Normalize pharmacokinetic study data and derive PK inputs.\n\n\
                  Every measurement is converted to the canonical unit of its category,\n\
                  substance amounts are reduced to masses, missing sd/se/cv are derived,\n\
                  and concentration time courses are exported with their dose and\n\
                  bodyweight context."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize every record of a study to canonical units.
    Normalize(NormalizeArgs),

    /// Normalize a study and export the PK inputs of its concentration profiles.
    Pk(PkArgs),

    /// List the canonical unit table.
    Units(UnitsArgs),

    /// Verify the standards directory and print what was loaded.
    Doctor(DoctorArgs),
}

#[derive(Parser)]
pub struct NormalizeArgs {
    /// Study document (JSON).
    #[arg(value_name = "STUDY_JSON")]
    pub study: PathBuf,

    /// Write the normalized study, summary and issues as JSON.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Stop at the first rejected record.
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Skip deriving missing sd, se and cv.
    #[arg(long = "no-statistics")]
    pub no_statistics: bool,

    /// Reject source units missing from a category's allowed list.
    #[arg(long = "strict-units")]
    pub strict_units: bool,
}

impl NormalizeArgs {
    pub fn options(&self) -> NormalizationOptions {
        NormalizationOptions::default()
            .with_allowed_units(self.strict_units)
            .with_statistics(!self.no_statistics)
            .with_fail_fast(self.fail_fast)
    }
}

#[derive(Parser)]
pub struct PkArgs {
    /// Study document (JSON).
    #[arg(value_name = "STUDY_JSON")]
    pub study: PathBuf,

    /// Directory for the per-profile CSV files and `bundles.json`.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,
}

#[derive(Parser)]
pub struct UnitsArgs {
    /// Only list categories of this kind.
    #[arg(long = "kind", value_enum)]
    pub kind: Option<KindArg>,
}

#[derive(Parser)]
pub struct DoctorArgs {
    /// Standards directory (default: PKDB_STANDARDS_DIR or the workspace `standards/`).
    #[arg(long = "standards-dir", value_name = "DIR")]
    pub standards_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Output,
    Intervention,
    Characteristic,
    Time,
}

impl From<KindArg> for MeasurementKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Output => MeasurementKind::Output,
            KindArg::Intervention => MeasurementKind::Intervention,
            KindArg::Characteristic => MeasurementKind::Characteristic,
            KindArg::Time => MeasurementKind::Time,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_flags_map_to_options() {
        let cli = Cli::parse_from([
            "pkdb",
            "-v",
            "normalize",
            "study.json",
            "--strict-units",
            "--no-statistics",
        ]);
        let Command::Normalize(args) = cli.command else {
            panic!("expected normalize");
        };
        let options = args.options();
        assert!(options.enforce_allowed_units);
        assert!(!options.derive_statistics);
        assert!(!options.fail_fast);
        assert!(args.output.is_none());
    }

    #[test]
    fn pk_requires_output_dir() {
        assert!(Cli::try_parse_from(["pkdb", "pk", "study.json"]).is_err());
        let cli = Cli::try_parse_from(["pkdb", "pk", "study.json", "--output-dir", "out"]).unwrap();
        assert!(matches!(cli.command, Command::Pk(_)));
    }

    #[test]
    fn global_log_flags_after_subcommand() {
        let cli = Cli::parse_from(["pkdb", "units", "--kind", "time", "--log-format", "json"]);
        assert!(matches!(cli.log_format, LogFormatArg::Json));
        let Command::Units(args) = cli.command else {
            panic!("expected units");
        };
        assert!(matches!(args.kind, Some(KindArg::Time)));
    }
}
