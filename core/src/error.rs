use thiserror::Error;

use crate::store::LifecycleState;

/// Every failure surfaced by a [`Store`](crate::Store) or a backend.
///
/// Engine failures keep the engine's own error name (the `DOMException` name in a browser) so
/// that callers can match on [`StoreError::code`] the same way they would against the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// An operation was issued before the handle reached the Ready state
    #[error("database is not ready (state: {0})")]
    NotReady(LifecycleState),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Duplicate primary key on `add`, or a unique index violation
    #[error("ConstraintError: {0}")]
    Constraint(String),

    /// Invalid key, missing key, or a value that cannot be stored
    #[error("DataError: {0}")]
    Data(String),

    /// Unknown object store or index
    #[error("NotFoundError: {0}")]
    NotFound(String),

    #[error("ReadOnlyError: {0}")]
    ReadOnly(String),

    #[error("TransactionInactiveError: {0}")]
    TransactionInactive(String),

    #[error("InvalidStateError: {0}")]
    InvalidState(String),

    #[error("InvalidAccessError: {0}")]
    InvalidAccess(String),

    /// Requested version is lower than the stored one
    #[error("VersionError: {0}")]
    Version(String),

    #[error("AbortError: {0}")]
    Abort(String),

    /// Any other engine error, keeping its name
    #[error("{code}: {message}")]
    Engine { code: String, message: String },
}

impl StoreError {
    /// The engine-level error name, e.g. `ConstraintError`
    pub fn code(&self) -> &str {
        match self {
            StoreError::NotReady(_) => "NotReadyError",
            StoreError::InvalidConfig(_) => "InvalidConfigError",
            StoreError::Constraint(_) => "ConstraintError",
            StoreError::Data(_) => "DataError",
            StoreError::NotFound(_) => "NotFoundError",
            StoreError::ReadOnly(_) => "ReadOnlyError",
            StoreError::TransactionInactive(_) => "TransactionInactiveError",
            StoreError::InvalidState(_) => "InvalidStateError",
            StoreError::InvalidAccess(_) => "InvalidAccessError",
            StoreError::Version(_) => "VersionError",
            StoreError::Abort(_) => "AbortError",
            StoreError::Engine { code, .. } => code,
        }
    }

    /// Map an engine error name back onto the matching variant
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "ConstraintError" => StoreError::Constraint(message),
            "DataError" => StoreError::Data(message),
            "NotFoundError" => StoreError::NotFound(message),
            "ReadOnlyError" => StoreError::ReadOnly(message),
            "TransactionInactiveError" => StoreError::TransactionInactive(message),
            "InvalidStateError" => StoreError::InvalidState(message),
            "InvalidAccessError" => StoreError::InvalidAccess(message),
            "VersionError" => StoreError::Version(message),
            "AbortError" => StoreError::Abort(message),
            code => StoreError::Engine { code: code.to_owned(), message },
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self { StoreError::Engine { code: "UnknownError".to_owned(), message: format!("{:#}", err) } }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self { StoreError::Data(err.to_string()) }
}
