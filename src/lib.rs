//! Course Ratings Library
//!
//! Fetches and submits star ratings for courses against a spreadsheet-backed
//! endpoint, caches summaries in memory, and renders an interactive star
//! widget. The `course-ratings` binary is a thin command-line host on top.

pub mod cache;
pub mod cli;
pub mod config;
pub mod ratings;
pub mod stars;

pub use config::{ClientConfig, ConfigureOptions};
pub use ratings::{
    CacheInfo, Rating, RatingClient, RatingSummary, SubmissionResult, SubmissionStatus,
};
pub use stars::{initialize_star_events, render_stars, StarEvent, StarWidget};
