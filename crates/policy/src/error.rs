//! Policy error types.

use crate::DenyReason;
use thiserror::Error;

/// Policy errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An action was denied. The reason reaches the request boundary
    /// unmodified.
    #[error("authorization denied: {0}")]
    Denied(DenyReason),
}

impl Error {
    /// The deny reason, when this is a denial.
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Error::Denied(reason) => Some(*reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
