use crate::Config;
use crate::clock::SystemClock;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::api_token::{IssueTokenRequest, TokenResponse, TokenValidateRequest};
use crate::models::validation::ValidationResult;
use crate::service::token_registry::TokenRegistry;
use rocket::http::Status;
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use validator::Validate;

/// Issue a new API token for an owner
#[openapi(tag = "Tokens")]
#[post("/", data = "<payload>")]
pub async fn issue_token(pool: &State<PgPool>, config: &State<Config>, payload: Json<IssueTokenRequest>) -> Result<Created<Json<TokenResponse>>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository::new(pool.inner().clone());
    let registry = TokenRegistry::new(&repo, &SystemClock, &config.token);
    let token = registry.issue(payload.owner_id, payload.label.as_deref(), payload.expires_at).await?;

    Ok(Created::new(format!("{}/tokens", config.api.base_path.trim_end_matches('/'))).body(Json(TokenResponse::from(token))))
}

/// Validate a token, optionally recording the use when it is valid
#[openapi(tag = "Tokens")]
#[post("/validate", data = "<payload>")]
pub async fn validate_token(
    pool: &State<PgPool>,
    config: &State<Config>,
    payload: Json<TokenValidateRequest>,
) -> Result<Json<ValidationResult<TokenResponse>>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository::new(pool.inner().clone());
    let registry = TokenRegistry::new(&repo, &SystemClock, &config.token);
    let result = if payload.touch {
        registry.validate_and_touch(&payload.token).await?
    } else {
        registry.validate(&payload.token).await?
    };

    Ok(Json(result.map(TokenResponse::from)))
}

/// Fetch a token record
#[openapi(tag = "Tokens")]
#[get("/<token>")]
pub async fn get_token(pool: &State<PgPool>, config: &State<Config>, token: &str) -> Result<Json<TokenResponse>, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let registry = TokenRegistry::new(&repo, &SystemClock, &config.token);
    let token = registry.lookup(token).await?;
    Ok(Json(TokenResponse::from(token)))
}

/// Deactivate a token without deleting it
#[openapi(tag = "Tokens")]
#[post("/<token>/deactivate")]
pub async fn deactivate_token(pool: &State<PgPool>, config: &State<Config>, token: &str) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    TokenRegistry::new(&repo, &SystemClock, &config.token).deactivate(token).await?;
    Ok(Status::NoContent)
}

/// Reactivate a previously deactivated token
#[openapi(tag = "Tokens")]
#[post("/<token>/activate")]
pub async fn activate_token(pool: &State<PgPool>, config: &State<Config>, token: &str) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    TokenRegistry::new(&repo, &SystemClock, &config.token).activate(token).await?;
    Ok(Status::NoContent)
}

/// Record that a token was just used
#[openapi(tag = "Tokens")]
#[post("/<token>/touch")]
pub async fn touch_token(pool: &State<PgPool>, config: &State<Config>, token: &str) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    TokenRegistry::new(&repo, &SystemClock, &config.token).touch(token).await?;
    Ok(Status::NoContent)
}

#[openapi(tag = "Tokens")]
#[delete("/<token>")]
pub async fn delete_token(pool: &State<PgPool>, config: &State<Config>, token: &str) -> Result<Status, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    TokenRegistry::new(&repo, &SystemClock, &config.token).delete(token).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        issue_token,
        validate_token,
        get_token,
        deactivate_token,
        activate_token,
        touch_token,
        delete_token
    ]
}
