use thiserror::Error;

use crate::release::ResolveError;

/// Reasons a version check is rejected or cannot be answered
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("User agent is not a recognized client")]
    UnauthorizedAgent,

    #[error("Invalid request: {0}")]
    ClientInput(&'static str),

    #[error("Unsupported package: {0:?}")]
    UnknownPackage(String),

    #[error("Release lookup failed: {0}")]
    Resolver(#[from] ResolveError),
}
