use crate::aggregation::{Snapshot, SubscriberOverview};
use crate::domain::{
    NewSubscriber, OwnerId, Subscriber, SubscriberEmail, SubscriberProfile, ValidationError,
};
use crate::lifecycle::{self, find_owned, LifecycleError};
use crate::routes::ApiError;
use crate::store::{Store, StoreError};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(serde::Deserialize)]
pub struct SubscriberProfileForm {
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl TryFrom<SubscriberProfileForm> for SubscriberProfile {
    type Error = ValidationError;
    fn try_from(form: SubscriberProfileForm) -> Result<Self, Self::Error> {
        SubscriberProfile::parse(form.email, form.first_name, form.last_name)
    }
}

#[derive(serde::Deserialize)]
pub struct NewSubscriberForm {
    #[serde(flatten)]
    profile: SubscriberProfileForm,
    #[serde(default)]
    tags: Vec<String>,
}

impl TryFrom<NewSubscriberForm> for NewSubscriber {
    type Error = ValidationError;
    fn try_from(form: NewSubscriberForm) -> Result<Self, Self::Error> {
        Ok(NewSubscriber {
            profile: form.profile.try_into()?,
            tags: form
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect::<BTreeSet<_>>(),
        })
    }
}

#[derive(serde::Serialize)]
struct SubscribersPage<'a> {
    subscribers: &'a [Subscriber],
    overview: SubscriberOverview,
}

/// The unique index can still fire when two requests race past the in-memory check.
fn duplicate_on_unique_violation(
    email: &SubscriberEmail,
) -> impl FnOnce(StoreError) -> ApiError + '_ {
    move |error| match error {
        StoreError::UniqueViolation { .. } => LifecycleError::DuplicateEmail {
            email: email.to_string(),
        }
        .into(),
        other => other.into(),
    }
}

#[tracing::instrument(name = "List subscribers", skip_all, fields(owner_id = %*owner_id))]
pub async fn list_subscribers(
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = owner_id.into_inner();
    let snapshot = Snapshot {
        subscribers: store.load_subscribers(owner_id).await?,
        ..Snapshot::default()
    };

    Ok(HttpResponse::Ok().json(SubscribersPage {
        subscribers: &snapshot.subscribers,
        overview: SubscriberOverview::compute(&snapshot, owner_id),
    }))
}

#[tracing::instrument(
    name = "Add a new subscriber",
    skip_all,
    fields(owner_id = %*owner_id, subscriber_email = %form.profile.email)
)]
pub async fn add_new_subscriber(
    web::Json(form): web::Json<NewSubscriberForm>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = owner_id.into_inner();
    let new_subscriber: NewSubscriber = form.try_into()?;

    let existing = store.load_subscribers(owner_id).await?;
    let subscriber = lifecycle::add_subscriber(owner_id, new_subscriber, &existing, Utc::now())?;

    store
        .insert_subscriber(&subscriber)
        .await
        .map_err(duplicate_on_unique_violation(&subscriber.email))?;

    Ok(HttpResponse::Created().json(subscriber))
}

#[tracing::instrument(
    name = "Edit a subscriber",
    skip_all,
    fields(owner_id = %*owner_id, subscriber_id = %*subscriber_id)
)]
pub async fn edit_subscriber_profile(
    subscriber_id: web::Path<Uuid>,
    web::Json(form): web::Json<SubscriberProfileForm>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let (owner_id, subscriber_id) = (owner_id.into_inner(), subscriber_id.into_inner());
    let profile: SubscriberProfile = form.try_into()?;

    let existing = store.load_subscribers(owner_id).await?;
    let subscriber = find_owned(&existing, owner_id, "subscriber", subscriber_id)?;
    let edited = lifecycle::edit_subscriber(subscriber, profile, &existing)?;

    let stored = store
        .update_subscriber_profile(&edited)
        .await
        .map_err(duplicate_on_unique_violation(&edited.email))?;

    Ok(HttpResponse::Ok().json(stored))
}

#[tracing::instrument(
    name = "Delete a subscriber",
    skip_all,
    fields(owner_id = %*owner_id, subscriber_id = %*subscriber_id)
)]
pub async fn delete_subscriber(
    subscriber_id: web::Path<Uuid>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let (owner_id, subscriber_id) = (owner_id.into_inner(), subscriber_id.into_inner());

    store
        .delete_subscriber(owner_id, subscriber_id)
        .await
        .map_err(|error| match error {
            StoreError::NotFound => ApiError::from(LifecycleError::NotFound {
                entity: "subscriber",
                id: subscriber_id,
            }),
            other => other.into(),
        })?;

    Ok(HttpResponse::NoContent().finish())
}
