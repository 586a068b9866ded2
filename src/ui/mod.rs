//! Terminal UI for the course ratings host
//!
//! Uses ratatui to draw the interactive star picker.

pub mod picker;

pub use picker::run as run_picker;
