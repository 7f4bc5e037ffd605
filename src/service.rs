//! The three operations exposed to transports: `Configure`, `Add`, `GetList`.
//!
//! Requests arrive as JSON text and every call returns a single `Result`.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::{
    domain::{HistoryInfo, HistoryParam},
    error::HistoryError,
    repository::HistoryRepository,
    store::StoreConfig,
};

/// Success reply of `Add`; serializes as the string `"true"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddReply;

impl AddReply {
    pub fn as_str(&self) -> &'static str {
        "true"
    }
}

impl Serialize for AddReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct Configured {
    config: StoreConfig,
    repo: Arc<HistoryRepository>,
}

#[derive(Default)]
pub struct HistoryService {
    configured: Mutex<Option<Configured>>,
}

impl HistoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Configure` with a JSON `{ConnectionString, DatabaseName}` payload.
    pub fn configure(&self, json_config: &str) -> Result<(), HistoryError> {
        let config = StoreConfig::from_json(json_config)?;
        self.configure_with(config)
    }

    /// Opens the store once. Repeating the same configuration is a no-op; a
    /// different one is refused because the open handle is never replaced.
    pub fn configure_with(&self, config: StoreConfig) -> Result<(), HistoryError> {
        let mut configured = self
            .configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = configured.as_ref() {
            if current.config == config {
                debug!(bucket = %config.database_name, "history store already configured");
                return Ok(());
            }
            return Err(HistoryError::initialization(
                config.connection_string,
                format!(
                    "already configured with {} (bucket '{}')",
                    current.config.connection_string, current.config.database_name
                ),
            ));
        }

        let repo = HistoryRepository::open(&config)?;
        info!(
            path = %config.connection_string,
            bucket = %config.database_name,
            "history service configured"
        );
        *configured = Some(Configured {
            config,
            repo: Arc::new(repo),
        });
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// `Add` with a JSON `{UserId?, ConnectionId, StartDate, EndDate}` payload.
    pub fn add(&self, json_params: &str) -> Result<AddReply, HistoryError> {
        let params: HistoryParam =
            serde_json::from_str(json_params).map_err(|e| HistoryError::InvalidParams {
                reason: format!("failed to decode Add params: {e}"),
            })?;
        self.add_param(&params)
    }

    pub fn add_param(&self, params: &HistoryParam) -> Result<AddReply, HistoryError> {
        self.repository()?.add(params)?;
        Ok(AddReply)
    }

    /// `GetList`. The arguments carry no meaning and are ignored.
    pub fn get_list(&self, args: &str) -> Result<Vec<HistoryInfo>, HistoryError> {
        debug!(args_len = args.len(), "get history list");
        self.repository()?.get_list()
    }

    fn repository(&self) -> Result<Arc<HistoryRepository>, HistoryError> {
        self.configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|configured| configured.repo.clone())
            .ok_or(HistoryError::NotConfigured)
    }
}
