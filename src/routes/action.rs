use crate::Config;
use crate::models::action::ActionResponse;
use rocket::data::{ByteUnit, Data};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;
use serde_json::Value;
use tracing::{error, info};

type ActionReply = (Status, Json<ActionResponse>);

fn internal_error() -> ActionReply {
    (Status::InternalServerError, Json(ActionResponse::error("Internal server error")))
}

/// Render a decoded JSON value for messages and logs.
///
/// Scalars read like their Python literals (`None`, `True`, `False`), which is
/// what existing front ends expect to see echoed back. Arrays and objects are
/// written as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn dispatch_action(action: &str, config: &Config) -> ActionResponse {
    match action {
        "login_redirect" => ActionResponse::redirect("Redirecting to login page", &config.auth_action.login_url),
        "signup_redirect" => ActionResponse::redirect("Redirecting to signup page", &config.auth_action.signup_url),
        other => ActionResponse::error(format!("Unknown action: {other}")),
    }
}

/// Map a front-end action to a redirect target.
///
/// Accepts `{action, timestamp}`. Unknown actions are answered with a 200
/// error body; only unreadable JSON is a client error. Bodies that are not
/// UTF-8, exceed `auth_action.max_body_bytes` or are not a JSON object are
/// internal failures.
#[openapi(skip)]
#[post("/action", data = "<data>")]
pub async fn auth_action(config: &State<Config>, data: Data<'_>) -> ActionReply {
    let body = match data.open(ByteUnit::from(config.auth_action.max_body_bytes)).into_bytes().await {
        Ok(body) if body.is_complete() => body.into_inner(),
        Ok(_) => {
            error!(limit = config.auth_action.max_body_bytes, "auth action body exceeds the size limit");
            return internal_error();
        }
        Err(err) => {
            error!(error = %err, "failed to read auth action body");
            return internal_error();
        }
    };

    let Ok(text) = String::from_utf8(body) else {
        error!("auth action body is not valid UTF-8");
        return internal_error();
    };

    let payload: Value = match serde_json::from_str(&text) {
        Ok(payload) => payload,
        Err(_) => return (Status::BadRequest, Json(ActionResponse::error("Invalid JSON data"))),
    };

    let Some(fields) = payload.as_object() else {
        error!("auth action body is not a JSON object");
        return internal_error();
    };

    let action = fields.get("action").map(display_value).unwrap_or_default();
    let timestamp = fields.get("timestamp").map(display_value).unwrap_or_default();

    info!(action = %action, timestamp = %timestamp, "auth action received");

    (Status::Ok, Json(dispatch_action(&action, config)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![auth_action]
}
