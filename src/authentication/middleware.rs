use crate::domain::OwnerId;
use crate::routes::ApiError;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::HeaderMap;
use actix_web::HttpMessage;
use actix_web_lab::middleware::Next;
use uuid::Uuid;

/// Header carrying the account id issued by the external identity provider.
pub const OWNER_HEADER: &str = "X-Owner-Id";

pub fn owner_from_headers(headers: &HeaderMap) -> Result<OwnerId, ApiError> {
    let value = headers
        .get(OWNER_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("The {} header is missing", OWNER_HEADER)))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("The {} header is not valid text", OWNER_HEADER)))?;

    Uuid::parse_str(value.trim())
        .map(OwnerId::new)
        .map_err(|_| ApiError::Unauthorized(format!("{} is not a valid owner id", value)))
}

pub async fn reject_anonymous_owners(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    match owner_from_headers(req.headers()) {
        Ok(owner_id) => {
            req.extensions_mut().insert(owner_id);
            next.call(req).await
        }
        Err(error) => Err(error.into()),
    }
}
