use crate::domain::{OwnerId, SubscriberEmail, ValidationError};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

const MAX_NAME_LENGTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
pub enum SubscriberStatus {
    #[strum(serialize = "active")]
    Active,
    #[strum(serialize = "unsubscribed")]
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn parse(status: &str) -> Result<Self, ValidationError> {
        Self::from_str(status).map_err(|_| {
            ValidationError::new("status", format!("{} is not a subscriber status", status))
        })
    }
}

/// `unsubscribed_at` only exists once the subscriber has left.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscriberState {
    Active,
    Unsubscribed { unsubscribed_at: DateTime<Utc> },
}

impl SubscriberState {
    pub fn status(&self) -> SubscriberStatus {
        match self {
            SubscriberState::Active => SubscriberStatus::Active,
            SubscriberState::Unsubscribed { .. } => SubscriberStatus::Unsubscribed,
        }
    }

    pub fn unsubscribed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            SubscriberState::Active => None,
            SubscriberState::Unsubscribed { unsubscribed_at } => Some(*unsubscribed_at),
        }
    }

    /// Rebuilds the state from its stored columns, rejecting rows that break the
    /// `unsubscribed_at` invariant.
    pub fn from_parts(
        status: SubscriberStatus,
        unsubscribed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        match (status, unsubscribed_at) {
            (SubscriberStatus::Active, None) => Ok(SubscriberState::Active),
            (SubscriberStatus::Unsubscribed, Some(unsubscribed_at)) => {
                Ok(SubscriberState::Unsubscribed { unsubscribed_at })
            }
            (SubscriberStatus::Active, Some(_)) => Err(ValidationError::new(
                "unsubscribed_at",
                "must be empty while the subscriber is active",
            )),
            (SubscriberStatus::Unsubscribed, None) => Err(ValidationError::new(
                "unsubscribed_at",
                "is required once the subscriber has unsubscribed",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    /// Blank input means "no name" rather than an error.
    pub fn parse_optional(
        field: &'static str,
        name: Option<String>,
    ) -> Result<Option<Self>, ValidationError> {
        let name = match name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return Ok(None),
        };
        if name.graphemes(true).count() > MAX_NAME_LENGTH {
            return Err(ValidationError::new(
                field,
                format!("cannot be longer than {} characters", MAX_NAME_LENGTH),
            ));
        }
        Ok(Some(Self(name)))
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub email: SubscriberEmail,
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub tags: BTreeSet<String>,
    pub subscribed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: SubscriberState,
}

impl Subscriber {
    pub fn status(&self) -> SubscriberStatus {
        self.state.status()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SubscriberState::Active)
    }
}

/// Editable part of a subscriber, validated.
#[derive(Debug, Clone)]
pub struct SubscriberProfile {
    pub email: SubscriberEmail,
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
}

impl SubscriberProfile {
    pub fn parse(
        email: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            email: SubscriberEmail::parse(email)?,
            first_name: PersonName::parse_optional("first_name", first_name)?,
            last_name: PersonName::parse_optional("last_name", last_name)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub profile: SubscriberProfile,
    pub tags: BTreeSet<String>,
}
