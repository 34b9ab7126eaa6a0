use crate::domain::{Campaign, CampaignStats, OwnerId, Subscriber, SubscriberState};
use crate::lifecycle::{self, LifecycleError, SendOutcome};
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    campaigns: Vec<Campaign>,
    subscribers: Vec<Subscriber>,
    stats: Vec<CampaignStats>,
}

impl Tables {
    fn unsent_campaign_mut(&mut self, campaign: &Campaign) -> Option<&mut Campaign> {
        self.campaigns
            .iter_mut()
            .find(|c| c.id == campaign.id && c.owner_id == campaign.owner_id && !c.is_sent())
    }

    fn subscriber_mut(&mut self, subscriber: &Subscriber) -> Option<&mut Subscriber> {
        self.subscribers
            .iter_mut()
            .find(|s| s.id == subscriber.id && s.owner_id == subscriber.owner_id)
    }
}

/// Process-local store with the same constraints as the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load_campaigns(&self, owner_id: OwnerId) -> Result<Vec<Campaign>, StoreError> {
        let tables = self.tables.lock().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut campaigns, |c| c.created_at);
        Ok(campaigns)
    }

    async fn load_subscribers(&self, owner_id: OwnerId) -> Result<Vec<Subscriber>, StoreError> {
        let tables = self.tables.lock().await;
        let mut subscribers: Vec<Subscriber> = tables
            .subscribers
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut subscribers, |s| s.subscribed_at);
        Ok(subscribers)
    }

    async fn load_campaign_stats(
        &self,
        campaign_ids: &[Uuid],
    ) -> Result<Vec<CampaignStats>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .stats
            .iter()
            .filter(|s| campaign_ids.contains(&s.campaign_id))
            .cloned()
            .collect())
    }

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "campaigns_pkey".into(),
            });
        }
        tables.campaigns.push(campaign.clone());
        Ok(())
    }

    async fn update_campaign_message(&self, campaign: &Campaign) -> Result<Campaign, StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .unsent_campaign_mut(campaign)
            .ok_or(StoreError::StaleWrite)?;
        stored.message = campaign.message.clone();
        Ok(stored.clone())
    }

    async fn update_campaign_schedule(
        &self,
        campaign: &Campaign,
    ) -> Result<Campaign, StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .unsent_campaign_mut(campaign)
            .ok_or(StoreError::StaleWrite)?;
        stored.scheduled_at = campaign.scheduled_at;
        stored.state = campaign.state.clone();
        Ok(stored.clone())
    }

    async fn send_campaign(
        &self,
        owner_id: OwnerId,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let active: Vec<Subscriber> = tables
            .subscribers
            .iter()
            .filter(|s| s.owner_id == owner_id && s.is_active())
            .cloned()
            .collect();
        let stored = tables
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id && c.owner_id == owner_id)
            .ok_or(LifecycleError::NotFound {
                entity: "campaign",
                id: campaign_id,
            })?;

        let outcome = lifecycle::send_campaign(stored, &active, now)?;
        stored.state = outcome.campaign.state.clone();
        Ok(outcome)
    }

    async fn delete_campaign(&self, owner_id: OwnerId, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.campaigns.len();
        tables
            .campaigns
            .retain(|c| !(c.id == id && c.owner_id == owner_id));
        if tables.campaigns.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_campaign_stats(&self, stats: &CampaignStats) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.stats.iter().any(|s| s.campaign_id == stats.campaign_id) {
            return Err(StoreError::UniqueViolation {
                constraint: "campaign_stats_campaign_id_key".into(),
            });
        }
        tables.stats.push(stats.clone());
        Ok(())
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .subscribers
            .iter()
            .any(|s| s.owner_id == subscriber.owner_id && s.email == subscriber.email);
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: "subscribers_owner_id_email_key".into(),
            });
        }
        tables.subscribers.push(subscriber.clone());
        Ok(())
    }

    async fn update_subscriber_profile(
        &self,
        subscriber: &Subscriber,
    ) -> Result<Subscriber, StoreError> {
        let mut tables = self.tables.lock().await;
        let taken = tables.subscribers.iter().any(|s| {
            s.owner_id == subscriber.owner_id && s.id != subscriber.id && s.email == subscriber.email
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: "subscribers_owner_id_email_key".into(),
            });
        }
        let stored = tables
            .subscriber_mut(subscriber)
            .ok_or(StoreError::NotFound)?;
        stored.email = subscriber.email.clone();
        stored.first_name = subscriber.first_name.clone();
        stored.last_name = subscriber.last_name.clone();
        stored.tags = subscriber.tags.clone();
        Ok(stored.clone())
    }

    async fn mark_unsubscribed(&self, subscriber: &Subscriber) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .subscriber_mut(subscriber)
            .ok_or(StoreError::NotFound)?;
        if !stored.is_active() {
            return Ok(false);
        }
        stored.state = match subscriber.state {
            SubscriberState::Unsubscribed { unsubscribed_at } => {
                SubscriberState::Unsubscribed { unsubscribed_at }
            }
            SubscriberState::Active => return Ok(false),
        };
        Ok(true)
    }

    async fn delete_subscriber(&self, owner_id: OwnerId, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.subscribers.len();
        tables
            .subscribers
            .retain(|s| !(s.id == id && s.owner_id == owner_id));
        if tables.subscribers.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
