use crate::clock::SystemClock;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::api_token::OwnerId;
use crate::models::pagination::{PaginatedResponse, PaginationParams};
use crate::models::report::{SessionListFilter, SessionReportRow, TokenListFilter, TokenReportRow};
use crate::service::reporting::ReportService;
use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::openapi;
use sqlx::PgPool;

/// List tokens, newest first
///
/// `expired` and the derived `is_valid` flag are evaluated against a single clock read.
#[openapi(tag = "Reports")]
#[get("/tokens?<owner_id>&<active>&<expired>&<search>&<page>&<limit>")]
pub async fn list_tokens(
    pool: &State<PgPool>,
    owner_id: Option<OwnerId>,
    active: Option<bool>,
    expired: Option<bool>,
    search: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Json<PaginatedResponse<TokenReportRow>>, AppError> {
    let filter = TokenListFilter {
        owner_id,
        active,
        expired,
        search,
    };
    let pagination = PaginationParams::new(page, limit);

    let repo = PostgresRepository::new(pool.inner().clone());
    let report = ReportService::new(&repo, &SystemClock).list_tokens(&filter, &pagination).await?;
    Ok(Json(report))
}

/// List sessions, newest first
#[openapi(tag = "Reports")]
#[get("/sessions?<owner_id>&<expired>&<search>&<page>&<limit>")]
pub async fn list_sessions(
    pool: &State<PgPool>,
    owner_id: Option<OwnerId>,
    expired: Option<bool>,
    search: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Json<PaginatedResponse<SessionReportRow>>, AppError> {
    let filter = SessionListFilter { owner_id, expired, search };
    let pagination = PaginationParams::new(page, limit);

    let repo = PostgresRepository::new(pool.inner().clone());
    let report = ReportService::new(&repo, &SystemClock).list_sessions(&filter, &pagination).await?;
    Ok(Json(report))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_tokens, list_sessions]
}
