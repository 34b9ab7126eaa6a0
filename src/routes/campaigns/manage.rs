use crate::aggregation::CampaignOverview;
use crate::domain::{Campaign, CampaignMessage, CampaignStats, OwnerId, ValidationError};
use crate::lifecycle::{self, find_owned, LifecycleError};
use crate::routes::ApiError;
use crate::store::{load_snapshot, Store, StoreError};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(serde::Deserialize)]
pub struct CampaignForm {
    name: String,
    subject: String,
    content: String,
}

impl TryFrom<CampaignForm> for CampaignMessage {
    type Error = ValidationError;
    fn try_from(form: CampaignForm) -> Result<Self, Self::Error> {
        CampaignMessage::parse(form.name, form.subject, form.content)
    }
}

#[derive(serde::Deserialize)]
pub struct ScheduleForm {
    scheduled_at: Option<DateTime<Utc>>,
}

#[derive(serde::Serialize)]
struct CampaignEntry<'a> {
    #[serde(flatten)]
    campaign: &'a Campaign,
    stats: Option<&'a CampaignStats>,
}

#[derive(serde::Serialize)]
struct CampaignsPage<'a> {
    campaigns: Vec<CampaignEntry<'a>>,
    overview: CampaignOverview,
}

/// A campaign that was sent in the meantime can no longer be written.
fn locked_on_stale_write(campaign_id: Uuid) -> impl FnOnce(StoreError) -> ApiError {
    move |error| match error {
        StoreError::StaleWrite => LifecycleError::CampaignLocked(campaign_id).into(),
        other => other.into(),
    }
}

#[tracing::instrument(name = "List campaigns", skip_all, fields(owner_id = %*owner_id))]
pub async fn list_campaigns(
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = owner_id.into_inner();
    let snapshot = load_snapshot(store.get_ref(), owner_id).await?;

    let campaigns = snapshot
        .campaigns_of(owner_id)
        .map(|campaign| CampaignEntry {
            campaign,
            stats: snapshot.stats.iter().find(|s| s.campaign_id == campaign.id),
        })
        .collect();

    Ok(HttpResponse::Ok().json(CampaignsPage {
        campaigns,
        overview: CampaignOverview::compute(&snapshot, owner_id),
    }))
}

#[tracing::instrument(
    name = "Create a campaign draft",
    skip_all,
    fields(owner_id = %*owner_id, campaign_name = %form.name)
)]
pub async fn create_campaign_draft(
    web::Json(form): web::Json<CampaignForm>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let message: CampaignMessage = form.try_into()?;
    let campaign = lifecycle::create_campaign(owner_id.into_inner(), message, Utc::now());

    store.insert_campaign(&campaign).await?;

    Ok(HttpResponse::Created().json(campaign))
}

#[tracing::instrument(
    name = "Edit a campaign",
    skip_all,
    fields(owner_id = %*owner_id, campaign_id = %*campaign_id)
)]
pub async fn edit_campaign_draft(
    campaign_id: web::Path<Uuid>,
    web::Json(form): web::Json<CampaignForm>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let (owner_id, campaign_id) = (owner_id.into_inner(), campaign_id.into_inner());
    let message: CampaignMessage = form.try_into()?;

    let campaigns = store.load_campaigns(owner_id).await?;
    let campaign = find_owned(&campaigns, owner_id, "campaign", campaign_id)?;
    let edited = lifecycle::edit_campaign(campaign, message)?;

    let stored = store
        .update_campaign_message(&edited)
        .await
        .map_err(locked_on_stale_write(campaign_id))?;

    Ok(HttpResponse::Ok().json(stored))
}

#[tracing::instrument(
    name = "Schedule a campaign",
    skip_all,
    fields(owner_id = %*owner_id, campaign_id = %*campaign_id)
)]
pub async fn schedule_campaign_send(
    campaign_id: web::Path<Uuid>,
    web::Json(form): web::Json<ScheduleForm>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let (owner_id, campaign_id) = (owner_id.into_inner(), campaign_id.into_inner());

    let campaigns = store.load_campaigns(owner_id).await?;
    let campaign = find_owned(&campaigns, owner_id, "campaign", campaign_id)?;
    let scheduled = lifecycle::schedule_campaign(campaign, form.scheduled_at)?;

    let stored = store
        .update_campaign_schedule(&scheduled)
        .await
        .map_err(|error| match error {
            StoreError::StaleWrite => ApiError::from(LifecycleError::AlreadySent(campaign_id)),
            other => other.into(),
        })?;

    Ok(HttpResponse::Ok().json(stored))
}

/// Stats rows of the deleted campaign are left in place.
#[tracing::instrument(
    name = "Delete a campaign",
    skip_all,
    fields(owner_id = %*owner_id, campaign_id = %*campaign_id)
)]
pub async fn delete_campaign(
    campaign_id: web::Path<Uuid>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let (owner_id, campaign_id) = (owner_id.into_inner(), campaign_id.into_inner());

    store
        .delete_campaign(owner_id, campaign_id)
        .await
        .map_err(|error| match error {
            StoreError::NotFound => ApiError::from(LifecycleError::NotFound {
                entity: "campaign",
                id: campaign_id,
            }),
            other => other.into(),
        })?;

    Ok(HttpResponse::NoContent().finish())
}
