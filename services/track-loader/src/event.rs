//!
//! src/event.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Storage write notifications as the queue delivers them: a batch of
//! envelopes, each body a json string holding the storage event
//!

use serde::Deserialize;

use crate::LoaderError;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<Envelope>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,
    pub body: String
}

#[derive(Debug, Deserialize)]
struct StorageEvent {
    // test events sent on subscription carry no records
    #[serde(rename = "Records", default)]
    records: Vec<StorageRecord>
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    s3: StorageEntity
}

#[derive(Debug, Deserialize)]
struct StorageEntity {
    bucket: BucketEntity,
    object: ObjectEntity
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
    #[serde(default)]
    size: Option<u64>
}

/// Object named by one storage write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
    pub size: Option<u64>
}

/// Keys arrive form encoded, `+` for space and `%XX` for the rest.
/// `+` is replaced first so that an encoded `%2B` survives as a literal plus
pub fn decode_key(raw: &str) -> Result<String, LoaderError> {
    let spaced = raw.replace('+', " ");
    percent_encoding::percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| LoaderError::Event(format!("invalid utf-8 in object key '{raw}': {e}")))
}

impl NotificationBatch {
    pub fn parse(raw: &str) -> Result<Self, LoaderError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl Envelope {
    /// Objects written, in the order the storage event lists them
    pub fn objects(&self) -> Result<Vec<ObjectRef>, LoaderError> {
        let event: StorageEvent = serde_json::from_str(&self.body)
            .map_err(|e| LoaderError::Event(format!(
                "envelope {}: {e}",
                self.message_id.as_deref().unwrap_or("<unknown>")
            )))?;

        let mut objects = Vec::with_capacity(event.records.len());
        for record in event.records {
            objects.push(ObjectRef {
                key: decode_key(&record.s3.object.key)?,
                bucket: record.s3.bucket.name,
                size: record.s3.object.size
            });
        }
        Ok(objects)
    }
}
