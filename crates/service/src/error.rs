use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An authorization denial, carried to the boundary unmodified.
    #[error(transparent)]
    Denied(#[from] policy::Error),
}

impl Error {
    /// The deny reason, when this error is an authorization denial.
    pub fn deny_reason(&self) -> Option<policy::DenyReason> {
        match self {
            Error::Denied(denied) => denied.reason(),
            Error::Storage(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
