use std::path::PathBuf;

use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::HistoryError;

/// Bucket layout: raw connection id bytes to encoded `HistoryRecord` bytes.
pub type BucketDefinition<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

/// The `Configure` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StoreConfig {
    /// Filesystem path of the database file.
    pub connection_string: String,
    /// Bucket holding the history records.
    pub database_name: String,
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        serde_json::from_str(json).map_err(|e| {
            HistoryError::initialization(
                "configuration",
                format!("failed to decode configuration: {e}"),
            )
        })
    }
}

/// An open database file plus the bucket every operation works in.
pub struct HistoryStore {
    db: Database,
    path: PathBuf,
    bucket: String,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("path", &self.path)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Opens (or creates) the database file and makes sure the bucket exists.
    ///
    /// Safe to call on every start: an existing file and bucket are reused
    /// as-is.
    pub fn open(config: &StoreConfig) -> Result<Self, HistoryError> {
        if config.connection_string.trim().is_empty() {
            return Err(HistoryError::initialization(
                "ConnectionString",
                "must not be empty",
            ));
        }
        if config.database_name.is_empty() {
            return Err(HistoryError::initialization(
                "DatabaseName",
                "must not be empty",
            ));
        }

        let path = PathBuf::from(&config.connection_string);
        let db = Database::create(&path)
            .map_err(|e| HistoryError::initialization(path.display().to_string(), e))?;

        let store = Self {
            db,
            path,
            bucket: config.database_name.clone(),
        };
        store.ensure_bucket()?;

        info!(
            path = %store.path.display(),
            bucket = %store.bucket,
            "history store ready"
        );
        Ok(store)
    }

    fn ensure_bucket(&self) -> Result<(), HistoryError> {
        let resource = || format!("bucket '{}'", self.bucket);

        let txn = self
            .db
            .begin_write()
            .map_err(|e| HistoryError::initialization(resource(), e))?;
        {
            let _table = txn
                .open_table(self.bucket_definition())
                .map_err(|e| HistoryError::initialization(resource(), e))?;
        }
        txn.commit()
            .map_err(|e| HistoryError::initialization(resource(), e))?;

        debug!(bucket = %self.bucket, "bucket ensured");
        Ok(())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn bucket_definition(&self) -> BucketDefinition<'_> {
        TableDefinition::new(&self.bucket)
    }
}
