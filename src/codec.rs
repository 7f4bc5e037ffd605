use tracing::warn;

use crate::domain::HistoryRecord;

#[derive(Debug)]
pub enum CodecError {
    Malformed(serde_json::Error),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed history record: {e}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
        }
    }
}

/// Encodes a record as a JSON array of `{"StartDate", "EndDate"}` objects.
pub fn encode(record: &HistoryRecord) -> Vec<u8> {
    serde_json::to_vec(record).expect("history record serializes to json")
}

/// Decodes a stored value.
///
/// Empty (or whitespace-only) input means "no prior record" and yields
/// `Ok(None)`; anything else that is not a valid record is `CodecError`.
pub fn decode(bytes: &[u8]) -> Result<Option<HistoryRecord>, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(CodecError::Malformed)
}

/// Like `decode`, but a missing or malformed value becomes an empty record.
pub fn decode_or_empty(bytes: &[u8]) -> HistoryRecord {
    match decode(bytes) {
        Ok(record) => record.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "replacing malformed history record");
            HistoryRecord::default()
        }
    }
}
