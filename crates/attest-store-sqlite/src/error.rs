//! Error type for `attest-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("uuid parse error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("date/time parse error: {0}")]
    DateParse(String),

    #[error("unknown event kind in store: {0}")]
    EventKind(String),

    /// Insert violated a uniqueness constraint (identity id or email
    /// already enrolled).
    #[error("identity already enrolled: {0}")]
    Conflict(String),
}

impl Error {
    /// Remap a constraint violation from an identity insert into the
    /// domain-level [`Error::Conflict`].
    pub(crate) fn identity_conflict(self, email: &str) -> Self {
        if let Error::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
            e,
            _,
        ))) = &self
        {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return Error::Conflict(email.to_owned());
            }
        }
        self
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
