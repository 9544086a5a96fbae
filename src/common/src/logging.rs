use crate::constants::LOG_FILE_NAME;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    prelude::*,
    EnvFilter,
};

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

pub fn setup_logging(verbose: bool, log_dir: Option<&Path>) -> Result<()> {
    let filter = default_filter(verbose);

    let stdout_layer = fmt::layer().with_target(true).with_timer(SystemTime);

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, LOG_FILE_NAME);

        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_target(true)
            .with_level(true)
            .with_timer(SystemTime)
            .with_ansi(false)
            .with_writer(file_appender)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match log_dir {
        Some(dir) => tracing::info!(
            "Logging system initialized. Writing to {}",
            dir.join(LOG_FILE_NAME).display()
        ),
        None => tracing::debug!("Logging system initialized"),
    }

    Ok(())
}
