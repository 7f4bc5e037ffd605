use crate::domain::{DomainError, TimestampField};

#[derive(Debug)]
pub enum HistoryError {
    /// The store could not be opened or its bucket could not be created.
    Initialization {
        resource: String,
        reason: String,
    },
    NotConfigured,
    BucketMissing {
        bucket: String,
    },
    /// The parameter envelope is not a structurally valid request.
    InvalidParams {
        reason: String,
    },
    InvalidConnectionId,
    InvalidTimestamp {
        field: TimestampField,
        value: String,
    },
    Persistence {
        op: &'static str,
        reason: String,
    },
}

impl HistoryError {
    pub fn initialization(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Initialization {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(op: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            op,
            reason: reason.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "initialization_error",
            Self::NotConfigured => "not_configured",
            Self::BucketMissing { .. } => "bucket_missing",
            Self::InvalidParams { .. } => "invalid_params",
            Self::InvalidConnectionId => "invalid_connection_id",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::Persistence { .. } => "persistence_error",
        }
    }
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialization { resource, reason } => {
                write!(f, "failed to initialize history store ({resource}): {reason}")
            }
            Self::NotConfigured => write!(f, "history store is not configured"),
            Self::BucketMissing { bucket } => write!(f, "bucket '{bucket}' doesn't exist"),
            Self::InvalidParams { reason } => write!(f, "invalid params: {reason}"),
            Self::InvalidConnectionId => {
                write!(f, "{}", DomainError::EmptyConnectionId)
            }
            Self::InvalidTimestamp { field, value } => write!(
                f,
                "{}",
                DomainError::InvalidTimestamp {
                    field: *field,
                    value: value.clone(),
                }
            ),
            Self::Persistence { op, reason } => write!(f, "{op} failed: {reason}"),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<DomainError> for HistoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::EmptyConnectionId => Self::InvalidConnectionId,
            DomainError::InvalidTimestamp { field, value } => {
                Self::InvalidTimestamp { field, value }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn domain_errors_keep_their_code_and_message() {
        let domain = DomainError::InvalidTimestamp {
            field: TimestampField::EndDate,
            value: "later".to_string(),
        };
        let message = domain.to_string();
        let code = domain.code();

        let err = HistoryError::from(domain);
        assert_eq!(err.code(), code);
        assert_eq!(err.to_string(), message);

        let err = HistoryError::from(DomainError::EmptyConnectionId);
        assert_eq!(err.code(), "invalid_connection_id");
    }

    #[test]
    fn messages_name_the_failing_resource() {
        let err = HistoryError::BucketMissing {
            bucket: "history".to_string(),
        };
        assert_eq!(err.to_string(), "bucket 'history' doesn't exist");

        let err = HistoryError::initialization("/nope/history.db", "permission denied");
        assert!(err.to_string().contains("/nope/history.db"));
        assert_eq!(err.code(), "initialization_error");
    }
}
