use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The referenced entity id does not resolve.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The acting user does not own the entity being changed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate unique field, or a subscription / like that already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A required field is missing or empty.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not subscribed to this channel")]
    NotSubscribed,

    #[error("Video is not liked")]
    NotLiked,

    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// A transactional operation could not commit; nothing was applied.
    #[error("Transaction '{operation}' failed: {reason}")]
    TransactionFailed {
        operation: &'static str,
        reason: String,
    },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Reference set column held something other than a JSON id array.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Password hashing / verification failure.
    #[error("Credential error: {0}")]
    Credential(#[from] vidcast_shared::SharedError),
}

impl StoreError {
    /// Storage failures inside a transaction become `TransactionFailed`;
    /// domain errors (not found, forbidden, ...) pass through unchanged.
    pub(crate) fn in_transaction(self, operation: &'static str) -> Self {
        match self {
            StoreError::Sqlite(e) => StoreError::TransactionFailed {
                operation,
                reason: e.to_string(),
            },
            StoreError::Json(e) => StoreError::TransactionFailed {
                operation,
                reason: e.to_string(),
            },
            other => other,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map a UNIQUE constraint violation to `Conflict`, anything else to `Sqlite`.
pub(crate) fn conflict_on_unique(what: &str) -> impl FnOnce(rusqlite::Error) -> StoreError + '_ {
    move |e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!("{what} already exists"))
        }
        other => StoreError::Sqlite(other),
    }
}

/// Map `QueryReturnedNoRows` to `NotFound(entity)`.
pub(crate) fn not_found(entity: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(entity),
        other => StoreError::Sqlite(other),
    }
}
