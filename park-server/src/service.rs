//! HTTP endpoints

use actix_web::web::{self, Data, Json, Path, ReqData, ServiceConfig};
use actix_web::{get, middleware, post};
use park::model::{Ride, RideId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::context::Context;
use crate::service::error::ApiError;


mod error;
mod session;

type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Login request body
#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

/// Login response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: UserId,
    key: String,
}

/// Exchanges email and password for a session key
#[post("/login")]
#[instrument(skip_all, fields(email = %credentials.email))]
async fn login(context: Data<Context>, credentials: Json<Credentials>) -> Result<Json<LoginResponse>> {
    let Credentials { email, password } = credentials.into_inner();
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(ApiError::BadRequest("Email and password are required"));
    }

    let (user_id, token) = context.sessions().login_with_email(&email, &password).await?;
    info!(user = %user_id, "User logged in");

    Ok(Json(LoginResponse {
        user_id,
        key: token.to_string(),
    }))
}

/// All rides with reviews and pictures attached
#[get("")]
#[instrument(skip_all, fields(user = %user.as_str()))]
async fn rides(context: Data<Context>, user: ReqData<UserId>) -> Result<Json<Vec<Ride>>> {
    let rides = context.rides().rides().await?;
    Ok(Json(rides))
}

/// Single ride with reviews and pictures attached
#[get("/{id}")]
#[instrument(skip_all, fields(user = %user.as_str(), ride = %id))]
async fn ride(context: Data<Context>, user: ReqData<UserId>, id: Path<RideId>) -> Result<Json<Ride>> {
    let ride = context.rides().ride(&id).await?;
    Ok(Json(ride))
}

/// Returns configuration function for the ActixWeb services
pub fn configure(context: Context) -> impl Fn(&mut ServiceConfig) + Clone {
    move |cfg: &mut ServiceConfig| {
        let authorized = web::scope("/rides")
            .wrap(middleware::from_fn(session::middleware))
            .service(rides)
            .service(ride);

        cfg.app_data(Data::new(context.clone()))
            .service(login)
            .service(authorized);
    }
}
