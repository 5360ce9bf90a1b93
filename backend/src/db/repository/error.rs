//! Failures reported by the vehicle and parking-log stores.
//!
//! Every variant carries an [`ErrorContext`] naming the operation and, where it
//! applies, the offending field or record. The HTTP layer maps variants onto
//! status codes; the Postgres store uses [`RepositoryError::is_retryable`] to
//! decide whether to run an operation again.

use std::fmt;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where an error happened and what it concerned.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation name, e.g. `handle_entry` or `list_logs`.
    pub operation: Option<String>,
    /// Field or record kind involved, e.g. `licensePlate` or `card`.
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    /// Extra detail surfaced to API clients for validation and conflict errors.
    pub details: Option<String>,
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("operation", self.operation.as_deref()),
            ("entity", self.entity.as_deref()),
            ("id", self.entity_id.as_deref()),
            ("details", self.details.as_deref()),
        ];
        let parts: Vec<String> = fields
            .iter()
            .filter_map(|(key, value)| value.map(|v| format!("{}={}", key, v)))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The input was rejected before anything was written.
    #[error("Validation error: {message} {context}")]
    ValidationError {
        message: String,
        context: ErrorContext,
    },

    /// A log id or plate that does not exist.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// A uniqueness rule rejected the write (card already in use).
    #[error("Conflict: {message} {context}")]
    Conflict {
        message: String,
        context: ErrorContext,
    },

    /// The store could not be reached. The Postgres store retries these.
    #[error("Connection error: {message} {context}")]
    ConnectionError {
        message: String,
        context: ErrorContext,
    },

    /// The store was reached but the operation failed, or returned a row this
    /// crate cannot interpret.
    #[error("Store error: {message} {context}")]
    StoreError {
        message: String,
        context: ErrorContext,
    },

    /// Backend selection or settings are unusable.
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    pub fn validation_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ValidationError {
            message: message.into(),
            context,
        }
    }

    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    pub fn conflict_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Conflict {
            message: message.into(),
            context,
        }
    }

    pub fn connection_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::store_with_context(message, ErrorContext::default())
    }

    pub fn store_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::StoreError {
            message: message.into(),
            context,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError { context, .. } => context.retryable,
            _ => false,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ValidationError { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::ConnectionError { context, .. }
            | Self::StoreError { context, .. }
            | Self::ConfigurationError { context, .. } => context,
        }
    }

    /// Replace the operation name, keeping the rest of the context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::ValidationError { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::ConnectionError { context, .. }
            | Self::StoreError { context, .. }
            | Self::ConfigurationError { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => {
                RepositoryError::not_found_with_context("Record not found", ErrorContext::default())
            }
            Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let context = ErrorContext::default().with_details(format!("{:?}", kind));
                match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        RepositoryError::conflict_with_context(message, context)
                    }
                    DatabaseErrorKind::ClosedConnection => {
                        RepositoryError::connection_with_context(message, context)
                    }
                    _ => RepositoryError::store_with_context(message, context),
                }
            }
            other => RepositoryError::store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_retryable() {
        let err = RepositoryError::connection_with_context("refused", ErrorContext::new("ping"));
        assert!(err.is_retryable());
        assert!(!RepositoryError::store("syntax error").is_retryable());
        let invalid = RepositoryError::validation_with_context("bad", ErrorContext::default());
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn test_with_operation_keeps_context() {
        let err = RepositoryError::conflict_with_context(
            "Card C1 already in use",
            ErrorContext::new("check_card").with_entity("card").with_entity_id("C1"),
        )
        .with_operation("create_log");

        let context = err.context();
        assert_eq!(context.operation.as_deref(), Some("create_log"));
        assert_eq!(context.entity.as_deref(), Some("card"));
        assert_eq!(
            err.to_string(),
            "Conflict: Card C1 already in use [operation=create_log, entity=card, id=C1]"
        );
    }
}
