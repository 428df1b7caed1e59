use std::fs::OpenOptions;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub fn init_tracing() {
    // File logging is opt-in via environment variable
    let file_logging = std::env::var("HUDDLE_LOG_FILE").ok();

    let registry = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::INFO),
    );

    let file = file_logging.as_ref().and_then(|log_path| {
        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", log_path, e);
                None
            }
        }
    });

    let result = match file {
        Some(file) => {
            let file_layer = fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
            registry.with(file_layer).try_init()
        }
        None => registry.try_init(),
    };

    // A subscriber installed by the host app wins
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
