//! Transactional reads and appends over the history bucket.
//!
//! All mutual exclusion comes from the store: write transactions are
//! serialized, and every read transaction sees the last committed snapshot.

use redb::{ReadableTable as _, TableError, TableHandle as _, WriteTransaction};
use tracing::{debug, info, warn};

use crate::{
    codec,
    domain::{HistoryInfo, HistoryParam},
    error::HistoryError,
    store::{HistoryStore, StoreConfig},
};

#[derive(Debug)]
pub struct HistoryRepository {
    store: HistoryStore,
}

impl HistoryRepository {
    pub fn new(store: HistoryStore) -> Self {
        Self { store }
    }

    pub fn open(config: &StoreConfig) -> Result<Self, HistoryError> {
        HistoryStore::open(config).map(Self::new)
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Lists every record in key order.
    ///
    /// Values that do not decode are skipped with a warning; storage errors
    /// abort the scan.
    pub fn get_list(&self) -> Result<Vec<HistoryInfo>, HistoryError> {
        let txn = self
            .store
            .database()
            .begin_read()
            .map_err(|e| HistoryError::persistence("begin read transaction", e))?;
        let table = match txn.open_table(self.store.bucket_definition()) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Err(self.bucket_missing()),
            Err(e) => return Err(HistoryError::persistence("open bucket", e)),
        };

        let mut histories = Vec::new();
        let mut skipped = 0usize;
        let entries = table
            .iter()
            .map_err(|e| HistoryError::persistence("scan bucket", e))?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| HistoryError::persistence("scan bucket", e))?;
            let connection_id = connection_id_from_key(key.value());
            match codec::decode(value.value()) {
                Ok(Some(record)) => histories.push(HistoryInfo::new(connection_id, record)),
                Ok(None) => {
                    debug!(connection_id = %connection_id, "skipping empty history record");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "skipping malformed history record"
                    );
                    skipped += 1;
                }
            }
        }

        debug!(
            bucket = %self.store.bucket(),
            count = histories.len(),
            skipped,
            "listed history"
        );
        Ok(histories)
    }

    /// Appends one interval to the record of `param.connection_id`.
    ///
    /// Nothing is written when validation fails. A stored value that does not
    /// decode counts as no prior record and is replaced.
    pub fn add(&self, param: &HistoryParam) -> Result<bool, HistoryError> {
        param.validate()?;

        let key = param.connection_id.as_bytes();
        let txn = self
            .store
            .database()
            .begin_write()
            .map_err(|e| HistoryError::persistence("begin write transaction", e))?;

        // Opening a table in a write transaction creates it; check first.
        if !bucket_exists(&txn, self.store.bucket())? {
            let _ = txn.abort();
            return Err(self.bucket_missing());
        }

        let atoms = {
            let mut table = txn
                .open_table(self.store.bucket_definition())
                .map_err(|e| HistoryError::persistence("open bucket", e))?;

            let existing = table
                .get(key)
                .map_err(|e| HistoryError::persistence("read record", e))?
                .map(|value| value.value().to_vec());
            let mut record = existing
                .as_deref()
                .map(codec::decode_or_empty)
                .unwrap_or_default();

            record.push(param.atom());
            let encoded = codec::encode(&record);
            table
                .insert(key, encoded.as_slice())
                .map_err(|e| HistoryError::persistence("write record", e))?;
            record.len()
        };

        txn.commit()
            .map_err(|e| HistoryError::persistence("commit", e))?;

        info!(
            connection_id = %param.connection_id,
            atoms,
            "history interval appended"
        );
        Ok(true)
    }

    fn bucket_missing(&self) -> HistoryError {
        HistoryError::BucketMissing {
            bucket: self.store.bucket().to_string(),
        }
    }
}

// Keys written by `add` are always UTF-8; anything else came from another writer.
fn connection_id_from_key(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(id) => id.to_string(),
        Err(e) => {
            let lossy = String::from_utf8_lossy(key).into_owned();
            warn!(connection_id = %lossy, error = %e, "history key is not valid utf-8");
            lossy
        }
    }
}

fn bucket_exists(txn: &WriteTransaction, bucket: &str) -> Result<bool, HistoryError> {
    let mut tables = txn
        .list_tables()
        .map_err(|e| HistoryError::persistence("list buckets", e))?;
    Ok(tables.any(|handle| handle.name() == bucket))
}
