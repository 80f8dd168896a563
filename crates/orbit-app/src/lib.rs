//! Client-side aggregation and interaction layer.
//!
//! Turns the store's flat result sets into per-viewer view-models (feeds,
//! comment trees, space listings) and funnels every relation mutation
//! through the toggle engine. Mutations never patch a view-model in place:
//! callers re-run the relevant fetch to observe new state.

pub mod comments;
pub mod error;
pub mod feed;
pub mod follows;
pub mod reports;
pub mod session;
pub mod spaces;
pub mod toggle;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::AppError;
