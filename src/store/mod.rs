// src/store/mod.rs

use std::fmt;

pub mod gateway;
pub mod source;

/// Error from a remote collaborator (question bank or persistence
/// gateway). The engine downgrades these to warnings; only read-only
/// endpoints surface them to the client.
#[derive(Debug)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}
