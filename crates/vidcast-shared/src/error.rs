use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Malformed password hash")]
    MalformedPasswordHash,

    #[error("Malformed access token")]
    TokenMalformed,

    #[error("Access token signature is invalid")]
    TokenSignature,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
