//!
//! src/main.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Entry point of the loader: reads one notification batch (from the file
//! named by the first argument, or stdin), runs it and prints the result
//!
//!

mod config;
mod errors;
mod logging;

mod event;
mod loader;
mod persistent;
mod schema;
mod secrets;
mod store;
mod types;

use std::sync::Arc;

use tokio::io::AsyncReadExt;

use crate::errors::LoaderError;

async fn read_batch() -> Result<event::NotificationBatch, LoaderError> {
    let raw = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(&path).await?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };
    event::NotificationBatch::parse(&raw)
}

#[tokio::main]
async fn main() -> Result<(), LoaderError> {
    let cfgs = config::load_config()?;
    let guard = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="track-loader",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let batch = read_batch().await?;

    let secrets   = secrets::ExtensionSecretStore::new(&cfgs.http, &cfgs.secrets)?;
    let warehouse = persistent::PgWarehouse::new(&cfgs.warehouse);
    let loader = loader::Loader::new(
        &cfgs,
        schema::TRACKS_V1,
        Arc::new(secrets),
        Arc::new(store::S3Buckets),
        Arc::new(warehouse)
    );

    let result = loader.run(&batch).await.inspect_err(|e| {
        tracing::error!(error = %e, "loader.failed");
    })?;

    println!("{}", serde_json::to_string(&result)?);
    if !result.is_success() {
        // flush buffered log lines before leaving without unwinding
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
