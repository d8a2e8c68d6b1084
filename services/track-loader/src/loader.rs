//!
//! src/loader.rs  Andrew Belles  Oct 3rd, 2025
//!
//! One loader run over a notification batch. Notifications are handled in
//! delivery order; the first download failure ends the run and nothing
//! after it is attempted. Rows appended before a failure stay appended
//!

use std::sync::Arc;

use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::config::{AdmissionConfig, AppConfig};
use crate::errors::LoaderError;
use crate::event::{NotificationBatch, ObjectRef};
use crate::persistent::{Warehouse, WarehouseSession};
use crate::schema::{TableSchema, decode_parquet};
use crate::secrets::{SecretStore, WarehouseCredentials};
use crate::store::{BucketStores, download};
use crate::types::InvocationResult;

pub const BODY_OK: &str = "File processed successfully!";
pub const BODY_DOWNLOAD_FAILED: &str = "Error downloading file from S3";
pub const BODY_EXECUTION_FAILED: &str = "Error during execution";

pub struct Loader {
    secret_name: String,
    admission: AdmissionConfig,
    schema: TableSchema,
    secrets: Arc<dyn SecretStore>,
    buckets: Arc<dyn BucketStores>,
    warehouse: Arc<dyn Warehouse>
}

impl Loader {
    pub fn new(
        cfg: &AppConfig,
        schema: TableSchema,
        secrets: Arc<dyn SecretStore>,
        buckets: Arc<dyn BucketStores>,
        warehouse: Arc<dyn Warehouse>
    ) -> Self {
        Self {
            secret_name: cfg.warehouse.secret_name.clone(),
            admission: cfg.admission.clone(),
            schema,
            secrets,
            buckets,
            warehouse
        }
    }

    /// Credential and download failures come back as a 500 result. Event,
    /// decode, schema and append failures are returned as errors
    pub async fn run(&self, batch: &NotificationBatch) -> Result<InvocationResult, LoaderError> {
        let span = tracing::info_span!(
            "loader.run",
            invocation = %Uuid::new_v4(),
            notifications = batch.records.len()
        );
        self.run_inner(batch).instrument(span).await
    }

    async fn run_inner(&self, batch: &NotificationBatch) -> Result<InvocationResult, LoaderError> {
        let credentials = match self.fetch_credentials().await {
            Ok(credentials) => credentials,
            Err(e) => {
                error!(error = %e, secret = %self.secret_name, "loader.credentials");
                return Ok(InvocationResult::failure(BODY_EXECUTION_FAILED));
            }
        };

        let mut session: Option<Box<dyn WarehouseSession>> = None;

        for envelope in &batch.records {
            for object in envelope.objects()? {
                if !self.admission.admits(&object.key) {
                    debug!(bucket = %object.bucket, key = %object.key, "loader.skip");
                    continue;
                }

                let data = match download(self.buckets.as_ref(), &object).await {
                    Ok(data) => data,
                    Err(e) => {
                        error!(error = %e, bucket = %object.bucket, key = %object.key,
                            "loader.download");
                        return Ok(InvocationResult::failure(BODY_DOWNLOAD_FAILED));
                    }
                };

                if session.is_none() {
                    session = Some(self.warehouse.open(&credentials).await?);
                }
                if let Some(open) = session.as_mut() {
                    self.load_object(&mut **open, &object, data).await?;
                }
            }
        }

        Ok(InvocationResult::success(BODY_OK))
    }

    async fn load_object(
        &self,
        session: &mut dyn WarehouseSession,
        object: &ObjectRef,
        data: bytes::Bytes
    ) -> Result<(), LoaderError> {
        let size = data.len();
        let decoded = decode_parquet(data)?;
        let conformed = self.schema.conform(&decoded)?;
        let written = session.append(&self.schema, &conformed).await?;

        info!(bucket = %object.bucket, key = %object.key, size, declared = ?object.size,
            rows = conformed.num_rows(), written, "loader.append");
        Ok(())
    }

    async fn fetch_credentials(&self) -> Result<WarehouseCredentials, LoaderError> {
        let secret = self.secrets.get_secrets(&self.secret_name).await?;
        WarehouseCredentials::from_secret(&secret)
    }
}
