use crate::domain::{
    NewSubscriber, OwnerId, Subscriber, SubscriberEmail, SubscriberProfile, SubscriberState,
};
use crate::lifecycle::{LifecycleError, Transition};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fails if another subscriber of `owner_id` already uses `email`.
/// `except` excludes the subscriber being edited from the check.
pub fn ensure_email_available(
    owner_id: OwnerId,
    email: &SubscriberEmail,
    existing: &[Subscriber],
    except: Option<Uuid>,
) -> Result<(), LifecycleError> {
    let taken = existing
        .iter()
        .filter(|s| s.owner_id == owner_id && Some(s.id) != except)
        .any(|s| &s.email == email);
    if taken {
        return Err(LifecycleError::DuplicateEmail {
            email: email.to_string(),
        });
    }
    Ok(())
}

pub fn add_subscriber(
    owner_id: OwnerId,
    new_subscriber: NewSubscriber,
    existing: &[Subscriber],
    now: DateTime<Utc>,
) -> Result<Subscriber, LifecycleError> {
    let NewSubscriber { profile, tags } = new_subscriber;
    ensure_email_available(owner_id, &profile.email, existing, None)?;

    Ok(Subscriber {
        id: Uuid::new_v4(),
        owner_id,
        email: profile.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        tags,
        subscribed_at: now,
        state: SubscriberState::Active,
    })
}

/// Contact details stay editable after unsubscribing.
pub fn edit_subscriber(
    subscriber: &Subscriber,
    profile: SubscriberProfile,
    existing: &[Subscriber],
) -> Result<Subscriber, LifecycleError> {
    ensure_email_available(
        subscriber.owner_id,
        &profile.email,
        existing,
        Some(subscriber.id),
    )?;

    Ok(Subscriber {
        email: profile.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        ..subscriber.clone()
    })
}

pub fn unsubscribe(subscriber: &Subscriber, now: DateTime<Utc>) -> Transition<Subscriber> {
    match subscriber.state {
        SubscriberState::Unsubscribed { .. } => Transition::Unchanged,
        SubscriberState::Active => Transition::Changed(Subscriber {
            state: SubscriberState::Unsubscribed {
                unsubscribed_at: now,
            },
            ..subscriber.clone()
        }),
    }
}
