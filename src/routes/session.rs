use crate::Config;
use crate::clock::SystemClock;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::middleware::{ClientIp, UserAgent};
use crate::models::session::{ExtendSessionRequest, OpenSessionRequest, SessionResponse, SessionValidateRequest};
use crate::models::validation::ValidationResult;
use crate::service::session_registry::SessionRegistry;
use chrono::Duration;
use rocket::http::Status;
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use validator::Validate;

fn ttl_or_default(ttl_seconds: Option<i64>, config: &Config) -> Result<Duration, AppError> {
    let seconds = ttl_seconds.unwrap_or(config.session.default_ttl_seconds);
    Duration::try_seconds(seconds).ok_or_else(|| AppError::InvalidArgument("ttl_seconds is out of range".to_string()))
}

/// Open a session for an owner
///
/// The IP address and user agent default to those of the calling client.
#[openapi(tag = "Sessions")]
#[post("/", data = "<payload>")]
pub async fn open_session(
    pool: &State<PgPool>,
    config: &State<Config>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    payload: Json<OpenSessionRequest>,
) -> Result<Created<Json<SessionResponse>>, AppError> {
    payload.validate()?;

    let ttl = ttl_or_default(payload.ttl_seconds, config)?;
    let ip_address = payload.ip_address.clone().or_else(|| client_ip.0.map(|ip| ip.to_string()));
    let user_agent = payload.user_agent.clone().or(user_agent.0);

    let repo = PostgresRepository::new(pool.inner().clone());
    let registry = SessionRegistry::new(&repo, &SystemClock, &config.session);
    let session = registry.open(payload.owner_id, ttl, ip_address.as_deref(), user_agent.as_deref()).await?;

    Ok(Created::new(format!("{}/sessions", config.api.base_path.trim_end_matches('/'))).body(Json(SessionResponse::from(session))))
}

#[openapi(tag = "Sessions")]
#[post("/validate", data = "<payload>")]
pub async fn validate_session(
    pool: &State<PgPool>,
    config: &State<Config>,
    payload: Json<SessionValidateRequest>,
) -> Result<Json<ValidationResult<SessionResponse>>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository::new(pool.inner().clone());
    let result = SessionRegistry::new(&repo, &SystemClock, &config.session)
        .validate(&payload.session_key)
        .await?;

    Ok(Json(result.map(SessionResponse::from)))
}

#[openapi(tag = "Sessions")]
#[get("/<session_key>")]
pub async fn get_session(pool: &State<PgPool>, config: &State<Config>, session_key: &str) -> Result<Json<SessionResponse>, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let session = SessionRegistry::new(&repo, &SystemClock, &config.session).lookup(session_key).await?;
    Ok(Json(SessionResponse::from(session)))
}

/// Push a session's expiry forward, reviving it if it had already expired
#[openapi(tag = "Sessions")]
#[post("/<session_key>/extend", data = "<payload>")]
pub async fn extend_session(
    pool: &State<PgPool>,
    config: &State<Config>,
    session_key: &str,
    payload: Json<ExtendSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let ttl = ttl_or_default(payload.ttl_seconds, config)?;

    let repo = PostgresRepository::new(pool.inner().clone());
    let session = SessionRegistry::new(&repo, &SystemClock, &config.session).extend(session_key, ttl).await?;
    Ok(Json(SessionResponse::from(session)))
}

/// Revoke (delete) a session
#[openapi(tag = "Sessions")]
#[delete("/<session_key>")]
pub async fn revoke_session(pool: &State<PgPool>, config: &State<Config>, session_key: &str) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    SessionRegistry::new(&repo, &SystemClock, &config.session).revoke(session_key).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![open_session, validate_session, get_session, extend_session, revoke_session]
}
