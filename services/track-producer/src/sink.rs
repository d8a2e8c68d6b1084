//!
//! src/sink.rs  Andrew Belles  Oct 2nd, 2025
//!
//! Writes a batch of track records to a local scratch csv, then uploads
//! the finished file to the raw bucket
//!

use std::{fs, path::{Path, PathBuf}, sync::Arc};

use object_store::{ObjectStore, aws::AmazonS3Builder, path::Path as ObjectPath};
use tracing::info;

use crate::errors::ProducerError;
use crate::types::TrackRecord;

/// S3 store bound to one bucket, credentials and region from the environment
pub fn s3_store(bucket: &str) -> Result<Arc<dyn ObjectStore>, ProducerError> {
    let store = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .build()
        .map_err(|e| ProducerError::Config(format!("build s3 store for {bucket}: {e}")))?;
    Ok(Arc::new(store))
}

/// Serializes records to csv with a header row in `TrackRecord` field order
pub fn encode_csv(records: &[TrackRecord], out: impl std::io::Write) ->
    Result<(), ProducerError> {
    let batch = serde_arrow::to_record_batch(&TrackRecord::fields(), &records)?;

    let mut writer = arrow_csv::WriterBuilder::new()
        .with_header(true)
        .build(out);
    writer.write(&batch)?;
    Ok(())
}

pub struct CsvSink {
    scratch: PathBuf,
    store: Arc<dyn ObjectStore>,
    bucket: String
}

impl CsvSink {
    pub fn new(scratch: impl AsRef<Path>, store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            scratch: scratch.as_ref().to_path_buf(),
            store,
            bucket: bucket.to_string()
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Writes `records` to `<scratch>/<file_name>` and returns its path
    pub fn write_csv(&self, file_name: &str, records: &[TrackRecord]) ->
        Result<PathBuf, ProducerError> {
        let path = self.scratch.join(file_name);

        fs::create_dir_all(&self.scratch).map_err(|e|
            ProducerError::Storage(
                format!("create dir {}: {e}", self.scratch.display())
        ))?;

        let temp = tempfile::NamedTempFile::new_in(&self.scratch)
            .map_err(|e| ProducerError::Storage(
                format!("tempfile in {}: {e}", self.scratch.display())
            ))?;

        encode_csv(records, temp.as_file())?;
        temp.as_file().sync_all()?;

        temp.persist(&path).map_err(|e|
            ProducerError::Storage(format!("persist {}: {e}", path.display())))?;

        Ok(path)
    }

    /// Uploads a local file under `key`, overwriting any previous object
    pub async fn upload(&self, local: &Path, key: &str) -> Result<(), ProducerError> {
        let bytes = tokio::fs::read(local).await?;
        let size = bytes.len();

        self.store.put(&ObjectPath::from(key), bytes.into()).await?;
        info!(bucket = %self.bucket, key, size, "sink.upload");
        Ok(())
    }
}
