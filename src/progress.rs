//! Utilities for creating and styling progress indicators using the `indicatif` crate.
//!
//! Contigs are read lazily so their number is not known up front; a spinner with a
//! running count is used instead of a bar. Indicators draw to stderr and are hidden
//! automatically when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner counting processed items of the given kind.
pub fn progress_spinner(unit: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template(
        "[{elapsed_precise}] {spinner:.cyan} {human_pos} {msg}",
    ).expect("Invalid progress style."));
    spinner.set_message(unit.to_string());

    spinner
}
