//! CLI argument definitions for the register validator.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "sblar",
    version,
    about = "Validate small business lending application registers",
    long_about = "Validate a small business lending application register (SBLAR).\n\n\
                  Runs syntactical, register, and logical validation phases over a\n\
                  CSV register and reports findings as a table, CSV, or JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

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
    /// Validate a register file.
    Validate(ValidateArgs),

    /// List every rule in the catalogue.
    Rules,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Path to the register CSV file.
    #[arg(value_name = "REGISTER")]
    pub register: PathBuf,

    /// Legal Entity Identifier of the filing institution.
    ///
    /// Enables the identifier-prefix check; without it that check passes
    /// for every record.
    #[arg(long = "lei", value_name = "LEI")]
    pub lei: Option<String>,

    /// Declared number of records in the register.
    #[arg(long = "expected-record-count", value_name = "N")]
    pub expected_record_count: Option<u64>,

    /// Additional context parameters as key=value pairs.
    #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub context: Vec<(String, String)>,

    /// CSV file of valid NAICS codes (columns: code,title).
    #[arg(long = "naics-file", value_name = "PATH")]
    pub naics_file: Option<PathBuf>,

    /// CSV file of valid census tract GEOIDs (column: geoid).
    #[arg(long = "geoids-file", value_name = "PATH")]
    pub geoids_file: Option<PathBuf>,

    /// Records per batch.
    #[arg(long = "batch-size", value_name = "N", default_value_t = sblar_ingest::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Treat catalogue columns missing from the header as blank instead of
    /// refusing the file.
    #[arg(long = "allow-missing-columns")]
    pub allow_missing_columns: bool,

    /// Run register and logical phases even when syntactical errors were
    /// found.
    #[arg(long = "run-all-phases")]
    pub run_all_phases: bool,

    /// Report warnings without failing validation on them.
    #[arg(long = "warnings-advisory")]
    pub warnings_advisory: bool,

    /// Maximum number of findings carried in the report.
    #[arg(long = "max-findings", value_name = "N", default_value_t = sblar_engine::DEFAULT_MAX_FINDINGS)]
    pub max_findings: usize,

    /// Report format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ReportFormatArg,

    /// Write the report to a file instead of stdout.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Table,
    Csv,
    Json,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_pairs_parse() {
        assert_eq!(
            parse_key_value("lei=ABC").unwrap(),
            ("lei".to_string(), "ABC".to_string())
        );
        assert!(parse_key_value("nonsense").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn cli_parses_validate_invocation() {
        use clap::Parser;
        let cli = Cli::parse_from([
            "sblar",
            "validate",
            "register.csv",
            "--lei",
            "000TESTFIUIDDONOTUSE",
            "--batch-size",
            "100",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.lei.as_deref(), Some("000TESTFIUIDDONOTUSE"));
                assert_eq!(args.batch_size, 100);
            }
            Command::Rules => panic!("expected validate"),
        }
    }
}
