//! Error types for the interactive shell.
//!
//! The choreography core never fails; everything here is about the window,
//! the landmark provider, configuration and the photo directory.

use thiserror::Error;

/// Result type for shell operations
pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("window error: {0}")]
    Window(String),

    #[error("landmark provider error: {0}")]
    Provider(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<minifb::Error> for AppError {
    fn from(err: minifb::Error) -> Self {
        AppError::Window(err.to_string())
    }
}
