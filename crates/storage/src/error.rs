use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// A persisted row violates an invariant the schema should have enforced,
    /// such as an entry with zero or multiple origin references or an entry
    /// with more than one attributed user.
    #[error("data integrity violation: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, Error>;
