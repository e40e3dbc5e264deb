//! Core domain errors.

use thiserror::Error;

/// Core domain errors for the GenAI client.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
