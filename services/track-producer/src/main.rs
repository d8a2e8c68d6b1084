//!
//! src/main.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Entry point of the producer: wires config, clients and sink together,
//! runs once and prints the invocation result for the caller
//!
//!

mod config;
mod errors;
mod logging;

mod fetch;
mod producer;
mod secrets;
mod sink;
mod types;

use std::sync::Arc;

use crate::errors::ProducerError;

#[tokio::main]
async fn main() -> Result<(), ProducerError> {
    let cfgs = config::load_config()?;
    let _guard = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="track-producer",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let secrets = secrets::ExtensionSecretStore::new(&cfgs.http, &cfgs.secrets)?;
    let spotify = fetch::SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;
    let store   = sink::s3_store(&cfgs.storage.bucket)?;
    let sink    = sink::CsvSink::new(&cfgs.storage.scratch_dir, store, &cfgs.storage.bucket);

    let producer = producer::Producer::new(
        &cfgs,
        Arc::new(secrets),
        Arc::new(spotify),
        sink
    );

    // "today" is the local clock of wherever the run executes
    let today = chrono::Local::now().date_naive();
    let result = producer.run(today).await.inspect_err(|e| {
        tracing::error!(error = %e, "producer.failed");
    })?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// Unit Tests
/// Spotify Test
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TrackCatalog;

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    #[tokio::test]
    #[allow(dead_code)]
    async fn spotify_search_testbench() -> Result<(), ProducerError> {
        dotenvy::dotenv().ok();

        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = config::load_config()?;
        let spotify = fetch::SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;
        let credentials = fetch::ClientCredentials {
            client_id: std::env::var("SPOTIFY_CLIENT_ID")
                .map_err(|_| ProducerError::Config("SPOTIFY_CLIENT_ID was not set".into()))?,
            client_secret: std::env::var("SPOTIFY_CLIENT_SECRET")
                .map_err(|_| ProducerError::Config("SPOTIFY_CLIENT_SECRET was not set".into()))?,
        };

        let tracks = spotify.search_tracks(&credentials, "all", 5).await?;
        assert!(!tracks.is_empty());

        for track in &tracks {
            let record = types::TrackRecord::from_catalog(track)?;
            println!("record: {}", serde_json::to_string_pretty(&record)?);
        }

        Ok(())
    }
}
