//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The acting or target user's email is not registered.
    #[error("no user with email '{email}'. Register one with 'scuttlebutt user add'")]
    UnknownUser { email: String },

    /// No role with the given name exists.
    #[error("no role named '{name}'")]
    UnknownRole { name: String },

    /// The command mutates content and needs a signed-in user.
    #[error("this command needs '--as <EMAIL>' to act as a signed-in user")]
    ActorRequired,

    /// An error from the configuration file.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error from the platform layer, including authorization denials.
    #[error(transparent)]
    Service(#[from] service::Error),

    /// An error from the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// Failed to serialize output.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
