use orbit_store::StoreError;
use thiserror::Error;

/// User-visible failure of an operation. Nothing here is fatal: every
/// failure path returns control with the last-known-good state intact.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("you must be signed in to do that")]
    NotAuthenticated,
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("you do not have permission to do that")]
    Forbidden,
    /// A primary read or a mutation failed at the backend. Secondary-read
    /// failures never surface as this; they degrade to defaults instead.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
