//! Session key verification

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage};
use tracing::debug;

use crate::context::Context;
use crate::service::error::ApiError;

/// Authorization scheme carrying the session key
const SCHEME: &str = "Bearer";

/// Rejects requests without a valid session key, attaching the authorized `UserId` otherwise
pub async fn middleware<B>(req: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::Unauthorized("Missing Authorization header"))?;

    let auth_header = auth_header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header"))?;

    let (scheme, key) = auth_header
        .split_once(' ')
        .ok_or(ApiError::Unauthorized("Invalid Authorization header"))?;

    if scheme != SCHEME {
        return Err(ApiError::Unauthorized("Invalid Authorization token scheme").into());
    }

    let context: Data<Context> = req
        .app_data()
        .cloned()
        .ok_or(ApiError::Unauthorized("Missing context"))?;

    let user_id = context
        .sessions()
        .validate(key.trim())
        .await
        .map_err(|err| {
            debug!(%err, "Session key rejected");
            ApiError::from(err)
        })?;

    req.extensions_mut().insert(user_id);
    next.call(req).await
}
