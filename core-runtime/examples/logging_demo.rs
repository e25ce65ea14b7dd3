//! Logging walkthrough for a media core session.
//!
//! Run with:
//! ```bash
//! cargo run --example logging_demo
//! cargo run --example logging_demo -- json
//! cargo run --example logging_demo -- text "provider_subsonic=trace"
//! ```

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_url, LogFormat, LoggingConfig,
};
use std::env;
use tracing::{debug, info, instrument, warn};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Text,
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("logging unavailable: {}", e);
        return;
    }

    info!(format = ?format, "Logging initialized");
    list_albums("https://music.example.com").await;
    add_provider("listener@example.com", "sesame");
}

#[instrument]
async fn list_albums(server: &str) {
    let request = format!(
        "{}/rest/getAlbumList2?u=listener&t=26719a1196d2a940705a59634eb18eab&s=c19b2d&type=alphabeticalByName&size=500",
        server
    );
    debug!(url = %redact_url(&request), "Sending Subsonic request");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    info!(albums = 42, "Album listing settled");
}

fn add_provider(username: &str, password: &str) {
    warn!(
        username = %redact_if_sensitive("username", username),
        password = %redact_if_sensitive("password", password),
        "Provider verification failed"
    );
}
