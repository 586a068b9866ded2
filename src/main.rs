//! Course Ratings - view and submit star ratings for a course
//!
//! A command-line host for the rating client: prints a course's current
//! rating, submits a rating, or opens an interactive terminal star picker.

mod ui;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use course_ratings::cli::{Cli, CliError, Command};
use course_ratings::stars::{format_rating_text, render_stars, render_stars_text};
use course_ratings::{ClientConfig, RatingClient, SubmissionResult};

/// Installs the stderr log subscriber
///
/// `RUST_LOG` wins over the `-v` level. Skipped for the interactive picker,
/// which owns the terminal.
fn init_logging(cli: &Cli) {
    if cli.is_interactive() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Turns a submission result into the process outcome
fn report_submission(result: SubmissionResult) -> Result<(), CliError> {
    if result.is_success() {
        println!("Thank you for your rating!");
        Ok(())
    } else {
        Err(CliError::SubmissionFailed(
            result
                .message
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_cli(&cli)?;
    let client = RatingClient::new(config);
    let _sweeper = client.spawn_sweeper();

    match cli.command {
        Command::Show { course_id, html } => {
            let summary = client.fetch_ratings(&course_id).await;
            if html {
                println!(
                    "{} ({})",
                    render_stars(summary.average, false),
                    format_rating_text(&summary)
                );
            } else {
                println!(
                    "{}  {:.1} ({})",
                    render_stars_text(summary.average),
                    summary.average,
                    format_rating_text(&summary)
                );
            }
            Ok(())
        }
        Command::Rate {
            course_id,
            value: Some(value),
        } => report_submission(client.submit_rating(&course_id, value).await),
        Command::Rate {
            course_id,
            value: None,
        } => match ui::run_picker(&client, &course_id).await? {
            Some(result) => report_submission(result),
            None => Ok(()),
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
