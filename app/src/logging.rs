//! Logging setup: stderr always, plus an optional daily log file.
//!
//! stdout carries the command protocol, so nothing is logged there.

use pipette_core::config::data_dir;
use pipette_core::PickerConfig;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// `RUST_LOG` when set, otherwise the configured directive.
fn filter(config: &PickerConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

pub fn setup(config: &PickerConfig) {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter(config));

    let file_layer = if config.log_to_file {
        let dir = log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Warning: failed to create log directory {:?}: {}", dir, e);
            None
        } else {
            let appender = RollingFileAppender::new(Rotation::DAILY, &dir, "pipette.log");
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(appender)
                    .with_filter(filter(config)),
            )
        }
    } else {
        None
    };

    match file_layer {
        Some(file_layer) => {
            tracing_subscriber::registry()
                .with(console_layer)
                .with(file_layer)
                .init();
            tracing::info!("File logging enabled: {:?}", log_dir());
        }
        None => {
            tracing_subscriber::registry().with(console_layer).init();
        }
    }
}
