//! Guild Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuildConfigError {
    #[error("{message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },
}
