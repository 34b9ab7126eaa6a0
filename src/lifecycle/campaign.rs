use crate::domain::{
    Campaign, CampaignMessage, CampaignState, CampaignStats, OwnerId, Subscriber,
};
use crate::lifecycle::LifecycleError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A campaign that has just been sent together with its freshly created stats row.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub campaign: Campaign,
    pub stats: CampaignStats,
}

pub fn create_campaign(owner_id: OwnerId, message: CampaignMessage, now: DateTime<Utc>) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        owner_id,
        message,
        created_at: now,
        scheduled_at: None,
        state: CampaignState::Draft,
    }
}

pub fn edit_campaign(campaign: &Campaign, message: CampaignMessage) -> Result<Campaign, LifecycleError> {
    if campaign.is_sent() {
        return Err(LifecycleError::CampaignLocked(campaign.id));
    }
    Ok(Campaign {
        message,
        ..campaign.clone()
    })
}

/// Moves a draft into `scheduled`. Nothing ever fires a scheduled campaign on its own.
pub fn schedule_campaign(
    campaign: &Campaign,
    scheduled_at: Option<DateTime<Utc>>,
) -> Result<Campaign, LifecycleError> {
    if campaign.is_sent() {
        return Err(LifecycleError::AlreadySent(campaign.id));
    }
    Ok(Campaign {
        scheduled_at,
        state: CampaignState::Scheduled,
        ..campaign.clone()
    })
}

/// Marks the campaign as sent to every active subscriber of its owner.
///
/// `subscribers` must be read from the same snapshot the send is evaluated against;
/// rows of other owners are ignored.
pub fn send_campaign(
    campaign: &Campaign,
    subscribers: &[Subscriber],
    now: DateTime<Utc>,
) -> Result<SendOutcome, LifecycleError> {
    if campaign.is_sent() {
        return Err(LifecycleError::AlreadySent(campaign.id));
    }

    let recipients = subscribers
        .iter()
        .filter(|s| s.owner_id == campaign.owner_id && s.is_active())
        .count() as u64;
    if recipients == 0 {
        return Err(LifecycleError::NoActiveSubscribers);
    }

    Ok(SendOutcome {
        campaign: Campaign {
            state: CampaignState::Sent { sent_at: now },
            ..campaign.clone()
        },
        stats: CampaignStats::at_send(campaign.id, recipients, now),
    })
}
