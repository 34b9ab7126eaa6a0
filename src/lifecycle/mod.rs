//! Status transitions for campaigns and subscribers.
//!
//! Every function here is pure: it takes the current entity (and, where a rule depends on
//! them, the owner's subscribers) plus the current time, and returns the next value.
//! Persisting the result is the caller's job.

mod campaign;
mod subscriber;

pub use campaign::*;
pub use subscriber::*;

use crate::domain::{OwnerId, Owned, ValidationError};
use crate::utils::error_chain_fmt;
use uuid::Uuid;

#[derive(thiserror::Error, PartialEq)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{email} is already used by another subscriber")]
    DuplicateEmail { email: String },
    #[error("Campaign {0} has already been sent and can no longer be edited")]
    CampaignLocked(Uuid),
    #[error("Campaign {0} has already been sent")]
    AlreadySent(Uuid),
    #[error("No active subscribers found")]
    NoActiveSubscribers,
    #[error("{entity} {id} was not found")]
    NotFound { entity: &'static str, id: Uuid },
}

impl std::fmt::Debug for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Outcome of an idempotent transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<T> {
    Changed(T),
    Unchanged,
}

/// Finds `id` among `entities`, treating rows of other owners as absent.
pub fn find_owned<'a, T: Owned>(
    entities: &'a [T],
    owner_id: OwnerId,
    entity: &'static str,
    id: Uuid,
) -> Result<&'a T, LifecycleError> {
    entities
        .iter()
        .find(|e| e.id() == id && e.owner_id() == owner_id)
        .ok_or(LifecycleError::NotFound { entity, id })
}
