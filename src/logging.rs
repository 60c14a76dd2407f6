//! Logging setup utilities for the application.
//!
//! This module configures logging to stderr and, optionally, a log file using the
//! `log4rs` crate. Standard output is reserved for the per-contig progress lines.

use std::path::Path;

use anyhow::Context;
use log::LevelFilter;
use log4rs::{
    append::{console::{ConsoleAppender, Target}, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

/// Configure logger to write to stderr and an optional log file.
pub fn setup_logger(log_file: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let pattern = "[{d(%Y-%m-%d %H:%M:%S)}] {h({l})}: {m}{n}";

    // log to stderr
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .target(Target::Stderr)
        .build();

    let mut config = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    // log to file
    if let Some(log_file) = log_file {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(pattern)))
            .build(log_file)
            .context(format!("Failed to create log file {}", log_file.display()))?;

        config = config.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("logfile", Box::new(logfile)),
        );
        root = root.appender("logfile");
    }

    let config = config
        .build(root.build(LevelFilter::Trace))
        .context("Failed to configure logger.")?;

    log4rs::init_config(config).context("Failed to initialize logger.")?;
    Ok(())
}
