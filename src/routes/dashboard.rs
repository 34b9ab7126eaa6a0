use crate::aggregation::DashboardSummary;
use crate::domain::OwnerId;
use crate::routes::ApiError;
use crate::store::{load_snapshot, Store};
use actix_web::{web, HttpResponse};

#[tracing::instrument(name = "Compute dashboard summary", skip_all, fields(owner_id = %*owner_id))]
pub async fn dashboard(
    store: web::Data<dyn Store>,
    owner_id: web::ReqData<OwnerId>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = owner_id.into_inner();
    let snapshot = load_snapshot(store.get_ref(), owner_id).await?;
    let summary = DashboardSummary::compute(&snapshot, owner_id);

    if !summary.unreconciled_campaigns.is_empty() {
        tracing::warn!(
            unreconciled = summary.unreconciled_campaigns.len(),
            "Sent campaigns without a stats row"
        );
    }

    Ok(HttpResponse::Ok().json(summary))
}
