//! Command-line argument parsing for PatentWhisperer
//!
//! clap derive parser with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PatentWhisperer - semantic patent search with retrieval-augmented answers
#[derive(Parser, Debug)]
#[command(name = "patentwhisperer")]
#[command(version)]
#[command(about = "Search patents by meaning and get grounded answers", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no progress bars, errors only on stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Embed and index patents from a JSON file
    Ingest {
        /// JSON array of {title, abstract, url?}
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Ask one question against the index
    Query {
        /// Natural-language question
        #[arg(value_name = "TEXT")]
        text: String,

        /// Number of patents to retrieve (1-10)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive query loop
    Shell,

    /// Run deployment diagnostics
    Doctor,

    /// Display resolved configuration (secrets masked)
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "patentwhisperer=info,warn",
            Verbosity::VeryVerbose => "patentwhisperer=debug,info",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv.iter().copied()).unwrap()
    }

    #[test]
    fn test_query_command() {
        let args = parse(&["patentwhisperer", "query", "gesture control in AR", "-k", "3", "--json"]);
        assert_eq!(
            args.command,
            Commands::Query {
                text: "gesture control in AR".to_string(),
                top_k: Some(3),
                json: true,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["patentwhisperer", "ingest", "patents.json", "-vv", "--config", "c.toml"]);
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert_eq!(
            args.command,
            Commands::Ingest {
                file: PathBuf::from("patents.json")
            }
        );
    }

    #[test]
    fn test_verbosity_quiet_wins() {
        let args = parse(&["patentwhisperer", "-q", "-v", "doctor"]);
        assert_eq!(args.verbosity(), Verbosity::Quiet);
        assert!(!args.verbosity().show_progress());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["patentwhisperer"]).is_err());
    }
}
