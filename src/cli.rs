//! Command-line interface parsing for the course ratings host
//!
//! This module handles parsing of CLI arguments using clap and turns them,
//! together with the optional config file, into a [`ClientConfig`].

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::config::{non_zero_secs, ClientConfig, ConfigError};

/// Error types surfaced by the command-line host
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The endpoint (or local validation) rejected the rating
    #[error("Rating was not submitted: {0}")]
    SubmissionFailed(String),

    /// The terminal could not be driven
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Course Ratings - view and submit star ratings for a course
#[derive(Parser, Debug)]
#[command(name = "course-ratings")]
#[command(about = "View and submit star ratings for courses")]
#[command(version)]
pub struct Cli {
    /// Ratings endpoint URL
    #[arg(long, global = true, value_name = "URL", env = "COURSE_RATINGS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// IP lookup service used to tag submissions
    #[arg(long = "ip-lookup", global = true, value_name = "URL")]
    pub ip_lookup: Option<String>,

    /// How long fetched ratings stay cached, in seconds
    #[arg(long = "cache-ttl", global = true, value_name = "SECS")]
    pub cache_ttl: Option<u64>,

    /// Path to a JSON config file
    ///
    /// Defaults to ~/.config/course-ratings/config.json when present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the current rating of a course
    Show {
        /// Course identifier
        course_id: String,

        /// Print the star markup instead of terminal glyphs
        #[arg(long)]
        html: bool,
    },

    /// Rate a course
    ///
    /// Examples:
    ///   course-ratings rate 42 5      # Submit five stars
    ///   course-ratings rate 42        # Pick stars interactively
    Rate {
        /// Course identifier
        course_id: String,

        /// Star value from 1 to 5; omit to open the interactive picker
        value: Option<u8>,
    },
}

impl Cli {
    /// Whether this invocation takes over the terminal
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, Command::Rate { value: None, .. })
    }

    /// Log filter directive implied by `--verbose`
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl ClientConfig {
    /// Builds the client configuration for parsed CLI arguments.
    ///
    /// Flags take precedence over the config file, which takes precedence
    /// over built-in defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = ClientConfig::load(cli.config.as_deref())?;

        if let Some(endpoint) = &cli.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(url) = &cli.ip_lookup {
            config.ip_lookup_url = url.clone();
        }
        if let Some(ttl) = non_zero_secs("--cache-ttl", cli.cache_ttl) {
            config.cache_ttl = ttl;
        }

        Ok(config)
    }
}
