//! Summary numbers for the dashboard, campaign and subscriber screens.
//!
//! All functions are order independent and read from an immutable [`Snapshot`].
//! A campaign without a stats row contributes nothing to the sums.

use crate::domain::{
    Campaign, CampaignStats, CampaignStatus, Owned, OwnerId, Subscriber, SubscriberStatus,
};
use std::collections::HashSet;
use uuid::Uuid;

/// Point-in-time view of one or more owners' data.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub campaigns: Vec<Campaign>,
    pub subscribers: Vec<Subscriber>,
    pub stats: Vec<CampaignStats>,
}

impl Snapshot {
    pub fn campaigns_of(&self, owner_id: OwnerId) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter().filter(move |c| c.owner_id == owner_id)
    }

    pub fn subscribers_of(&self, owner_id: OwnerId) -> impl Iterator<Item = &Subscriber> {
        self.subscribers.iter().filter(move |s| s.owner_id == owner_id)
    }

    /// Stats rows whose campaign belongs to `owner_id`.
    pub fn stats_of(&self, owner_id: OwnerId) -> impl Iterator<Item = &CampaignStats> {
        let campaign_ids: HashSet<Uuid> = self.campaigns_of(owner_id).map(|c| c.id).collect();
        self.stats
            .iter()
            .filter(move |s| campaign_ids.contains(&s.campaign_id))
    }

    /// Sent campaigns that never got their stats row recorded.
    pub fn sent_without_stats(&self, owner_id: OwnerId) -> Vec<Uuid> {
        let recorded: HashSet<Uuid> = self.stats.iter().map(|s| s.campaign_id).collect();
        let mut ids: Vec<Uuid> = self
            .campaigns_of(owner_id)
            .filter(|c| c.is_sent() && !recorded.contains(&c.id))
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }
}

/// Entities counted per status.
pub trait StatusTracked: Owned {
    type Status: PartialEq;

    fn current_status(&self) -> Self::Status;
}

impl StatusTracked for Campaign {
    type Status = CampaignStatus;

    fn current_status(&self) -> CampaignStatus {
        self.status()
    }
}

impl StatusTracked for Subscriber {
    type Status = SubscriberStatus;

    fn current_status(&self) -> SubscriberStatus {
        self.status()
    }
}

pub fn count_subscribers(snapshot: &Snapshot, owner_id: OwnerId) -> u64 {
    snapshot.subscribers_of(owner_id).count() as u64
}

pub fn count_campaigns(snapshot: &Snapshot, owner_id: OwnerId) -> u64 {
    snapshot.campaigns_of(owner_id).count() as u64
}

pub fn count_by_status<T: StatusTracked>(entities: &[T], owner_id: OwnerId, status: T::Status) -> u64 {
    entities
        .iter()
        .filter(|e| e.owner_id() == owner_id && e.current_status() == status)
        .count() as u64
}

pub fn total_sent(snapshot: &Snapshot, owner_id: OwnerId) -> u64 {
    snapshot.stats_of(owner_id).map(|s| s.total_sent).sum()
}

pub fn total_opened(snapshot: &Snapshot, owner_id: OwnerId) -> u64 {
    snapshot.stats_of(owner_id).map(|s| s.total_opened).sum()
}

/// Opened over sent, as a percentage. Zero when nothing has been sent.
pub fn average_open_rate(snapshot: &Snapshot, owner_id: OwnerId) -> f64 {
    open_rate(total_opened(snapshot, owner_id), total_sent(snapshot, owner_id))
}

fn open_rate(opened: u64, sent: u64) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    (opened as f64 / sent as f64 * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubscriberOverview {
    pub total: u64,
    pub active: u64,
    pub unsubscribed: u64,
}

impl SubscriberOverview {
    pub fn compute(snapshot: &Snapshot, owner_id: OwnerId) -> Self {
        Self {
            total: count_subscribers(snapshot, owner_id),
            active: count_by_status(&snapshot.subscribers, owner_id, SubscriberStatus::Active),
            unsubscribed: count_by_status(
                &snapshot.subscribers,
                owner_id,
                SubscriberStatus::Unsubscribed,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CampaignOverview {
    pub total: u64,
    pub drafts: u64,
    pub scheduled: u64,
    pub sent: u64,
}

impl CampaignOverview {
    pub fn compute(snapshot: &Snapshot, owner_id: OwnerId) -> Self {
        let campaigns = &snapshot.campaigns;
        Self {
            total: count_campaigns(snapshot, owner_id),
            drafts: count_by_status(campaigns, owner_id, CampaignStatus::Draft),
            scheduled: count_by_status(campaigns, owner_id, CampaignStatus::Scheduled),
            sent: count_by_status(campaigns, owner_id, CampaignStatus::Sent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DashboardSummary {
    pub subscribers: SubscriberOverview,
    pub campaigns: CampaignOverview,
    pub total_sent: u64,
    pub total_opened: u64,
    pub average_open_rate: f64,
    pub unreconciled_campaigns: Vec<Uuid>,
}

impl DashboardSummary {
    pub fn compute(snapshot: &Snapshot, owner_id: OwnerId) -> Self {
        let total_sent = total_sent(snapshot, owner_id);
        let total_opened = total_opened(snapshot, owner_id);
        Self {
            subscribers: SubscriberOverview::compute(snapshot, owner_id),
            campaigns: CampaignOverview::compute(snapshot, owner_id),
            total_sent,
            total_opened,
            average_open_rate: open_rate(total_opened, total_sent),
            unreconciled_campaigns: snapshot.sent_without_stats(owner_id),
        }
    }
}
