use rocket::serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Body returned by the auth action endpoint.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: ActionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl ActionResponse {
    pub fn redirect(message: &str, redirect_url: &str) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.to_string(),
            redirect_url: Some(redirect_url.to_string()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            message: message.into(),
            redirect_url: None,
        }
    }
}
