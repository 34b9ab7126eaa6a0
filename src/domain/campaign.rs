use crate::domain::{OwnerId, ValidationError};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

const MAX_HEADLINE_LENGTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
pub enum CampaignStatus {
    #[strum(serialize = "draft")]
    Draft,
    #[strum(serialize = "scheduled")]
    Scheduled,
    #[strum(serialize = "sent")]
    Sent,
}

impl CampaignStatus {
    pub fn parse(status: &str) -> Result<Self, ValidationError> {
        Self::from_str(status).map_err(|_| {
            ValidationError::new("status", format!("{} is not a campaign status", status))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CampaignState {
    Draft,
    Scheduled,
    Sent { sent_at: DateTime<Utc> },
}

impl CampaignState {
    pub fn status(&self) -> CampaignStatus {
        match self {
            CampaignState::Draft => CampaignStatus::Draft,
            CampaignState::Scheduled => CampaignStatus::Scheduled,
            CampaignState::Sent { .. } => CampaignStatus::Sent,
        }
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CampaignState::Sent { sent_at } => Some(*sent_at),
            _ => None,
        }
    }

    pub fn from_parts(
        status: CampaignStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        match (status, sent_at) {
            (CampaignStatus::Draft, None) => Ok(CampaignState::Draft),
            (CampaignStatus::Scheduled, None) => Ok(CampaignState::Scheduled),
            (CampaignStatus::Sent, Some(sent_at)) => Ok(CampaignState::Sent { sent_at }),
            (CampaignStatus::Sent, None) => Err(ValidationError::new(
                "sent_at",
                "is required once the campaign is sent",
            )),
            (_, Some(_)) => Err(ValidationError::new(
                "sent_at",
                "must be empty until the campaign is sent",
            )),
        }
    }
}

/// Name, subject and body of a campaign. All three are required.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CampaignMessage {
    name: String,
    subject: String,
    content: String,
}

impl CampaignMessage {
    pub fn parse(name: String, subject: String, content: String) -> Result<Self, ValidationError> {
        Ok(Self {
            name: parse_headline("name", name)?,
            subject: parse_headline("subject", subject)?,
            content: parse_required("content", content)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

fn parse_required(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "cannot be empty"));
    }
    Ok(value)
}

fn parse_headline(field: &'static str, value: String) -> Result<String, ValidationError> {
    let value = parse_required(field, value)?;
    if value.graphemes(true).count() > MAX_HEADLINE_LENGTH {
        return Err(ValidationError::new(
            field,
            format!("cannot be longer than {} characters", MAX_HEADLINE_LENGTH),
        ));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Campaign {
    pub id: Uuid,
    pub owner_id: OwnerId,
    #[serde(flatten)]
    pub message: CampaignMessage,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: CampaignState,
}

impl Campaign {
    pub fn status(&self) -> CampaignStatus {
        self.state.status()
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.state, CampaignState::Sent { .. })
    }
}
