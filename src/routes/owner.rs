use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::api_token::OwnerId;
use crate::models::report::OwnerPurgeResponse;
use crate::service::owner_cleanup::OwnerCleanup;
use rocket::serde::json::Json;
use rocket::{State, delete};
use rocket_okapi::openapi;
use sqlx::PgPool;

/// Remove every token and session held by an owner
///
/// Called by the user directory after it deletes the user. Safe to repeat.
#[openapi(tag = "Owners")]
#[delete("/<owner_id>")]
pub async fn purge_owner(pool: &State<PgPool>, owner_id: OwnerId) -> Result<Json<OwnerPurgeResponse>, AppError> {
    let repo = PostgresRepository::new(pool.inner().clone());
    let purged = OwnerCleanup::new(&repo).purge_owner(owner_id).await?;
    Ok(Json(purged))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![purge_owner]
}
