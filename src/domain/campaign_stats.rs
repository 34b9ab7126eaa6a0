use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Delivery counters recorded once per sent campaign.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CampaignStats {
    pub campaign_id: Uuid,
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_opened: u64,
    pub total_clicked: u64,
    pub total_bounced: u64,
    pub total_unsubscribed: u64,
    pub created_at: DateTime<Utc>,
}

impl CampaignStats {
    /// Counters for a campaign that has just gone out to `total_sent` recipients.
    pub fn at_send(campaign_id: Uuid, total_sent: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            total_sent,
            total_delivered: 0,
            total_opened: 0,
            total_clicked: 0,
            total_bounced: 0,
            total_unsubscribed: 0,
            created_at,
        }
    }

    pub fn open_rate(&self) -> f64 {
        if self.total_sent == 0 {
            return 0.0;
        }
        self.total_opened as f64 / self.total_sent as f64 * 100.0
    }
}
