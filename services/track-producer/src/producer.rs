//!
//! src/producer.rs  Andrew Belles  Oct 2nd, 2025
//!
//! One producer run: credentials, catalog search, projection, csv,
//! upload. Nothing is recovered locally, every error ends the run
//!

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, CredentialsConfig, SearchConfig, StorageConfig};
use crate::errors::ProducerError;
use crate::fetch::{ClientCredentials, TrackCatalog};
use crate::secrets::{SecretStore, require_field};
use crate::sink::CsvSink;
use crate::types::{InvocationResult, TrackRecord};

pub struct Producer {
    credentials: CredentialsConfig,
    search: SearchConfig,
    storage: StorageConfig,
    secrets: Arc<dyn SecretStore>,
    catalog: Arc<dyn TrackCatalog>,
    sink: CsvSink
}

impl Producer {
    pub fn new(
        cfg: &AppConfig,
        secrets: Arc<dyn SecretStore>,
        catalog: Arc<dyn TrackCatalog>,
        sink: CsvSink
    ) -> Self {
        Self {
            credentials: cfg.credentials.clone(),
            search: cfg.search.clone(),
            storage: cfg.storage.clone(),
            secrets,
            catalog,
            sink
        }
    }

    /// Runs once, naming the batch after `today`
    pub async fn run(&self, today: NaiveDate) -> Result<InvocationResult, ProducerError> {
        let span = tracing::info_span!("producer.run", invocation = %Uuid::new_v4());
        self.run_inner(today).instrument(span).await
    }

    async fn run_inner(&self, today: NaiveDate) -> Result<InvocationResult, ProducerError> {
        let credentials = self.fetch_credentials().await?;

        let tracks = self.catalog
            .search_tracks(&credentials, &self.search.query, self.search.limit)
            .await?;
        info!(query = %self.search.query, limit = self.search.limit,
            count = tracks.len(), "producer.search");

        // no header can be written without a first record
        if tracks.is_empty() {
            return Err(ProducerError::EmptySearch(self.search.query.clone()));
        }

        let records = tracks.iter()
            .map(TrackRecord::from_catalog)
            .collect::<Result<Vec<_>, _>>()?;

        let file_name = self.storage.file_name(today);
        let key = self.storage.object_key(&file_name);

        let local = self.sink.write_csv(&file_name, &records)?;
        debug!(path = %local.display(), rows = records.len(), "producer.scratch");

        self.sink.upload(&local, &key).await?;

        Ok(InvocationResult::success(format!(
            "File {file_name} has been uploaded to {}/{}.",
            self.sink.bucket(),
            self.storage.raw_prefix.trim_end_matches('/')
        )))
    }

    async fn fetch_credentials(&self) -> Result<ClientCredentials, ProducerError> {
        let secret = self.secrets.get_secrets(&self.credentials.secret_name).await?;
        Ok( ClientCredentials {
            client_id: require_field(&secret, &self.credentials.client_id_field)?,
            client_secret: require_field(&secret, &self.credentials.client_secret_field)?
        })
    }
}
