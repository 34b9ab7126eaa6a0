use crate::domain::OwnerId;
use crate::lifecycle::{self, find_owned, Transition};
use crate::routes::ApiError;
use crate::store::Store;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

/// Unsubscribing twice succeeds and leaves the first timestamp untouched.
#[tracing::instrument(
    name = "Unsubscribe a subscriber",
    skip_all,
    fields(owner_id = %*owner_id, subscriber_id = %*subscriber_id)
)]
pub async fn unsubscribe_subscriber(
    subscriber_id: web::Path<Uuid>,
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let (owner_id, subscriber_id) = (owner_id.into_inner(), subscriber_id.into_inner());

    let subscribers = store.load_subscribers(owner_id).await?;
    let subscriber = find_owned(&subscribers, owner_id, "subscriber", subscriber_id)?;

    if let Transition::Changed(unsubscribed) = lifecycle::unsubscribe(subscriber, Utc::now()) {
        if store.mark_unsubscribed(&unsubscribed).await? {
            return Ok(HttpResponse::Ok().json(unsubscribed));
        }
    }

    // Already unsubscribed, possibly by a concurrent request: answer with the stored row
    tracing::info!("Subscriber had already unsubscribed");
    let subscribers = store.load_subscribers(owner_id).await?;
    let stored = find_owned(&subscribers, owner_id, "subscriber", subscriber_id)?;
    Ok(HttpResponse::Ok().json(stored))
}
