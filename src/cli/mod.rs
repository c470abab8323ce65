//! CLI module for deep-research
//!
//! Provides command-line interface parsing for the deep-research binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::types::{ResearchMode, RunOptions};
use crate::utils::toml_config::ResearchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// deep-research - cited Markdown reports from iterative web research
///
/// Plans a report, researches every section with a bounded loop of web
/// searches and site crawls, and writes the result with one consistent
/// reference list.
#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    author,
    version,
    about = "deep-research - cited Markdown reports from iterative web research",
    long_about = "Plans a report for a query, researches every section concurrently with a bounded\n\
                  loop of web searches and site crawls, and assembles a Markdown report with a\n\
                  single, consistently numbered reference list.\n\n\
                  The report is written to stdout (or --output); progress and logs go to stderr.",
    after_help = "EXAMPLES:\n    \
                  deep-research -q \"State of WebAssembly outside the browser\"\n    \
                  deep-research -q \"Tokio vs async-std\" --mode simple --output-length \"2 pages\"\n    \
                  echo \"History of the Rust borrow checker\" | deep-research --verbose\n    \
                  deep-research -q \"...\" --config my.toml --output report.md"
)]
pub struct Cli {
    /// The research query (read from stdin when omitted)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Research pipeline to run
    #[arg(short, long, value_enum, default_value_t = ModeArg::Deep)]
    pub mode: ModeArg,

    /// Maximum iterations per research loop (overrides the config file)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Maximum minutes per research loop (overrides the config file)
    #[arg(long, value_name = "MINUTES")]
    pub max_time: Option<u64>,

    /// Desired length of the output, e.g. "5 pages" (simple mode)
    #[arg(long)]
    pub output_length: Option<String>,

    /// Extra instructions for the output (simple mode)
    #[arg(long)]
    pub output_instructions: Option<String>,

    /// Path to the configuration file (defaults to ./deep-research.toml if present)
    #[arg(short, long, env = "DEEP_RESEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print progress events while researching
    #[arg(short, long)]
    pub verbose: bool,

    /// Plan without the scoping search (deep mode)
    #[arg(long)]
    pub no_scoping: bool,

    /// Log span timings for each research section
    #[arg(long)]
    pub tracing: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Research mode accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Plan sections, research them concurrently, assemble a cited report
    Deep,
    /// One research loop over the whole query
    Simple,
}

impl From<ModeArg> for ResearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Deep => ResearchMode::Deep,
            ModeArg::Simple => ResearchMode::Simple,
        }
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply bound overrides to the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ResearchConfig) {
        if let Some(max_iterations) = self.max_iterations {
            config.research.max_iterations = max_iterations;
        }
        if let Some(max_time) = self.max_time {
            config.research.max_time_minutes = max_time;
        }
        if self.no_scoping {
            config.research.scoping_search = false;
        }
    }

    /// Build run options for `query` from the flags and configuration.
    pub fn run_options(&self, query: String, config: &ResearchConfig) -> RunOptions {
        RunOptions {
            query,
            mode: self.mode.into(),
            bounds: config.research.bounds(),
            output_length: self.output_length.clone(),
            output_instructions: self.output_instructions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["deep-research"]).unwrap();
        assert_eq!(cli.query, None);
        assert_eq!(cli.mode, ModeArg::Deep);
        assert!(!cli.verbose);
        assert!(!cli.tracing);
        assert!(!cli.no_scoping);
    }

    #[test]
    fn test_no_scoping_disables_the_scoping_search() {
        let cli = Cli::try_parse_from(["deep-research", "--no-scoping"]).unwrap();
        let mut config = ResearchConfig::default();
        assert!(config.research.scoping_search);

        cli.apply_overrides(&mut config);
        assert!(!config.research.scoping_search);
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "deep-research",
            "-q",
            "rust",
            "--mode",
            "simple",
            "--max-iterations",
            "2",
            "--max-time",
            "3",
            "--output-length",
            "1 page",
        ])
        .unwrap();

        let mut config = ResearchConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.research.max_iterations, 2);
        assert_eq!(config.research.max_time_minutes, 3);

        let options = cli.run_options("rust".to_string(), &config);
        assert_eq!(options.mode, ResearchMode::Simple);
        assert_eq!(options.bounds.max_iterations, 2);
        assert_eq!(options.bounds.max_time, Duration::from_secs(180));
        assert_eq!(options.output_length.as_deref(), Some("1 page"));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["deep-research", "--mode", "fast"]).is_err());
    }
}
