use crate::models::action::ActionResponse;
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{Request, catch};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Error {
    pub message: String,
}

fn message(text: &str) -> Json<Error> {
    Json(Error { message: text.to_string() })
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<Error> {
    message("Bad request")
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<Error> {
    message("Not found")
}

#[catch(409)]
pub fn conflict(_: &Request) -> Json<Error> {
    message("Conflict")
}

/// Rocket answers 422 when a JSON body does not match the expected shape.
#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<Error> {
    message("Unprocessable entity")
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<Error> {
    message("Internal server error")
}

/// The action endpoint keeps its `{status, message}` shape even for failures it did not handle itself.
#[catch(500)]
pub fn action_internal_error(_: &Request) -> Json<ActionResponse> {
    Json(ActionResponse::error("Internal server error"))
}
