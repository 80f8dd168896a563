//! Idempotent add/remove for uniquely-keyed relations.
//!
//! The store only exposes insert and delete, so a toggle is a two-state
//! transition per (relation, subject, object) key: try the insert, and when
//! the uniqueness constraint reports the pair already present, delete it
//! instead. Two toggles issued concurrently for the same pair race the
//! insert against the delete; the unique constraint prevents duplicate rows
//! but the net state is only knowable from the next fetch. Accepted
//! limitation — callers re-fetch after every mutation anyway.

use tracing::debug;
use uuid::Uuid;

use orbit_store::{Store, StoreError};
use orbit_types::models::Relation;

use crate::error::AppError;
use crate::session::ViewerSession;

/// Acknowledges that the toggle ran. The resulting state is deliberately
/// not part of the answer: callers re-read counts and flags to learn it.
#[derive(Debug, Clone, Copy)]
pub struct ToggleAck {
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationState {
    Absent,
    Present,
}

/// Invert the presence of the relation row for (viewer, object).
///
/// Domain rules (e.g. rejecting a self-follow) are the caller's job; the
/// engine is relation-agnostic.
pub async fn toggle<S: Store>(
    store: &S,
    relation: Relation,
    session: &dyn ViewerSession,
    object: Uuid,
) -> Result<ToggleAck, AppError> {
    let subject = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    let state = transition(store, relation, subject, object).await?;
    debug!(?relation, %subject, %object, ?state, "relation toggled");
    Ok(ToggleAck { applied: true })
}

/// One state transition against insert/delete-only storage. Returns the
/// state the pair was left in.
async fn transition<S: Store>(
    store: &S,
    relation: Relation,
    subject: Uuid,
    object: Uuid,
) -> Result<RelationState, AppError> {
    match store.insert_relation(relation, subject, object).await {
        Ok(()) => Ok(RelationState::Present),
        // The pair was already present, so the intent is "toggle off".
        Err(StoreError::UniqueViolation) => {
            store.delete_relation(relation, subject, object).await?;
            Ok(RelationState::Absent)
        }
        // Any other insert failure surfaces as-is; no delete is attempted.
        Err(err) => Err(AppError::Storage(err)),
    }
}
