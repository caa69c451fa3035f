//! Song Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SongError {
    #[error("Unsupported song domain: {0}")]
    UnsupportedDomain(String),
}
