mod memory;
mod postgres;

pub use memory::*;
pub use postgres::*;

use crate::aggregation::Snapshot;
use crate::domain::{Campaign, CampaignStats, OwnerId, Subscriber, ValidationError};
use crate::lifecycle::{LifecycleError, SendOutcome};
use crate::utils::error_chain_fmt;
use chrono::{DateTime, Utc};
use async_trait::async_trait;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint {constraint} was violated")]
    UniqueViolation { constraint: String },
    #[error("Row was not found")]
    NotFound,
    #[error("Row is missing or can no longer be modified")]
    StaleWrite,
    #[error("Stored row is invalid")]
    InvalidRow(#[from] ValidationError),
    /// A lifecycle rule evaluated against the rows read inside the store.
    #[error(transparent)]
    Rejected(#[from] LifecycleError),
    #[error("Failed to execute a database query")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::UniqueViolation {
                    constraint: db_error.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        StoreError::Database(error)
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Persistence for campaigns, subscribers and campaign stats.
///
/// Every read and write is scoped to one owner. Failures are returned as-is;
/// implementations never retry.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_campaigns(&self, owner_id: OwnerId) -> Result<Vec<Campaign>, StoreError>;

    async fn load_subscribers(&self, owner_id: OwnerId) -> Result<Vec<Subscriber>, StoreError>;

    async fn load_campaign_stats(
        &self,
        campaign_ids: &[Uuid],
    ) -> Result<Vec<CampaignStats>, StoreError>;

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError>;

    /// Writes name, subject and content of a campaign that has not been sent and returns
    /// the stored row. Fails with [`StoreError::StaleWrite`] when the row is missing or
    /// already sent.
    async fn update_campaign_message(&self, campaign: &Campaign) -> Result<Campaign, StoreError>;

    /// Writes status and `scheduled_at` of a campaign that has not been sent, leaving the
    /// message columns alone. Same failure modes as [`Store::update_campaign_message`].
    async fn update_campaign_schedule(&self, campaign: &Campaign)
        -> Result<Campaign, StoreError>;

    /// Sends a campaign atomically: the campaign row and the owner's active subscribers
    /// are read under one lock, `lifecycle::send_campaign` decides, and only the status
    /// columns are written. The stats row is not inserted here.
    async fn send_campaign(
        &self,
        owner_id: OwnerId,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, StoreError>;

    async fn delete_campaign(&self, owner_id: OwnerId, id: Uuid) -> Result<(), StoreError>;

    /// At most one stats row exists per campaign.
    async fn insert_campaign_stats(&self, stats: &CampaignStats) -> Result<(), StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] when the owner already has the email.
    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<(), StoreError>;

    /// Writes email, names and tags only, and returns the stored row. The subscription
    /// state is never touched here.
    async fn update_subscriber_profile(
        &self,
        subscriber: &Subscriber,
    ) -> Result<Subscriber, StoreError>;

    /// Stores the unsubscribed state only if the row is still active.
    /// Returns `false` when another request got there first.
    async fn mark_unsubscribed(&self, subscriber: &Subscriber) -> Result<bool, StoreError>;

    async fn delete_subscriber(&self, owner_id: OwnerId, id: Uuid) -> Result<(), StoreError>;
}

#[tracing::instrument(name = "Load owner snapshot", skip(store))]
pub async fn load_snapshot(store: &dyn Store, owner_id: OwnerId) -> Result<Snapshot, StoreError> {
    let campaigns = store.load_campaigns(owner_id).await?;
    let subscribers = store.load_subscribers(owner_id).await?;
    let campaign_ids: Vec<Uuid> = campaigns.iter().map(|c| c.id).collect();
    let stats = store.load_campaign_stats(&campaign_ids).await?;

    Ok(Snapshot {
        campaigns,
        subscribers,
        stats,
    })
}
