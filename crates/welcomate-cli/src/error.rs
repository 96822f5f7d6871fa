use std::io;

use thiserror::Error;
use welcomate_core::BindError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] welcomate_core::Error),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Registration failed for {0}")]
    RegistrationFailed(String),
    #[error("Invalid account or password")]
    LoginFailed,
    #[error("Password update failed for {0}")]
    PasswordUpdateFailed(String),
    #[error("Delete failed for {0}")]
    DeleteFailed(String),
    #[error("Account {0} already exists in the service store")]
    DuplicateServiceUser(String),
    #[error("Account is not an administrator")]
    PermissionDenied,
}
