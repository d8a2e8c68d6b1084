//!
//! src/store.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Object storage access for the loader. Notifications may name any
//! bucket, so stores are opened per bucket on demand
//!

use std::sync::Arc;

use bytes::Bytes;
use object_store::{ObjectStore, aws::AmazonS3Builder, path::Path as ObjectPath};

use crate::errors::LoaderError;
use crate::event::ObjectRef;

pub trait BucketStores: Send + Sync {
    fn open(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, LoaderError>;
}

/// S3 stores, credentials and region from the environment
#[derive(Debug, Default, Clone)]
pub struct S3Buckets;

impl BucketStores for S3Buckets {
    fn open(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, LoaderError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| LoaderError::UpstreamFetch(
                format!("build s3 store for {bucket}: {e}")
            ))?;
        Ok(Arc::new(store))
    }
}

/// Reads the whole object into memory
pub async fn download(stores: &dyn BucketStores, object: &ObjectRef) ->
    Result<Bytes, LoaderError> {
    let store = stores.open(&object.bucket)?;
    let location = ObjectPath::from(object.key.as_str());
    let data = store.get(&location).await?.bytes().await?;
    Ok(data)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use object_store::memory::InMemory;

    use super::*;

    /// In memory buckets keyed by name; unknown buckets fail to open
    #[derive(Default)]
    pub(crate) struct MemoryBuckets {
        pub(crate) buckets: HashMap<String, Arc<dyn ObjectStore>>
    }

    impl MemoryBuckets {
        pub(crate) async fn put(&mut self, bucket: &str, key: &str, data: Bytes) {
            let store = self.buckets
                .entry(bucket.to_string())
                .or_insert_with(|| Arc::new(InMemory::new()) as Arc<dyn ObjectStore>)
                .clone();
            store.put(&ObjectPath::from(key), data.into()).await.unwrap();
        }
    }

    impl BucketStores for MemoryBuckets {
        fn open(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, LoaderError> {
            self.buckets.get(bucket)
                .cloned()
                .ok_or_else(|| LoaderError::UpstreamFetch(format!("no such bucket {bucket}")))
        }
    }

    fn object(bucket: &str, key: &str) -> ObjectRef {
        ObjectRef { bucket: bucket.to_string(), key: key.to_string(), size: None }
    }

    #[tokio::test]
    async fn download_reads_object_bytes() {
        let mut buckets = MemoryBuckets::default();
        buckets.put("stage", "stage-data/a.parquet", Bytes::from_static(b"PAR1")).await;

        let data = download(&buckets, &object("stage", "stage-data/a.parquet")).await.unwrap();
        assert_eq!(data.as_ref(), b"PAR1");
    }

    #[tokio::test]
    async fn missing_object_or_bucket_is_fetch_error() {
        let mut buckets = MemoryBuckets::default();
        buckets.put("stage", "stage-data/a.parquet", Bytes::from_static(b"PAR1")).await;

        for missing in [object("stage", "stage-data/b.parquet"), object("other", "stage-data/a.parquet")] {
            let err = download(&buckets, &missing).await.unwrap_err();
            assert!(matches!(err, LoaderError::UpstreamFetch(_)), "{missing:?}");
        }
    }
}
