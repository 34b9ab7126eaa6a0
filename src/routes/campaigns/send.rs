use crate::domain::{Campaign, CampaignStats, OwnerId};
use crate::routes::ApiError;
use crate::store::Store;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, serde::Serialize)]
pub struct SendReport {
    pub campaign: Campaign,
    pub recipients: u64,
    /// False when the campaign went out but its stats row could not be written.
    pub stats_recorded: bool,
    pub stats: Option<CampaignStats>,
}

#[tracing::instrument(
    name = "Send a campaign",
    skip_all,
    fields(owner_id = %*owner_id, campaign_id = %*campaign_id)
)]
pub async fn send_campaign_now(
    campaign_id: web::Path<Uuid>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let report = record_send(
        store.get_ref(),
        owner_id.into_inner(),
        campaign_id.into_inner(),
        Utc::now(),
    )
    .await?;

    tracing::info!(recipients = report.recipients, "Campaign sent");
    Ok(HttpResponse::Ok().json(report))
}

/// Sends the campaign through the store, then records its stats.
///
/// A failed stats insert does not undo the send. It is logged and reported through
/// `stats_recorded` so the caller can reconcile later.
pub async fn record_send(
    store: &dyn Store,
    owner_id: OwnerId,
    campaign_id: Uuid,
    now: DateTime<Utc>,
) -> Result<SendReport, ApiError> {
    let outcome = store.send_campaign(owner_id, campaign_id, now).await?;
    let (campaign, stats) = (outcome.campaign, outcome.stats);

    let stats_recorded = match store.insert_campaign_stats(&stats).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                campaign_id = %campaign.id,
                "Failed to record campaign stats, campaign stays sent"
            );
            false
        }
    };

    Ok(SendReport {
        recipients: stats.total_sent,
        stats: stats_recorded.then_some(stats),
        campaign,
        stats_recorded,
    })
}
