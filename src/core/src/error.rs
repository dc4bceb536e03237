//! Error types for the shared data model

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure parsing a model value from its wire name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Unknown authorization '{0}'")]
    UnknownAuthorization(String),

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),
}
