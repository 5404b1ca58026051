use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Why a token or session failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NotFound,
    Inactive,
    Expired,
}

/// Outcome of a combined lookup-and-validate call.
///
/// An invalid result is a normal answer, not an error. `record` is present
/// whenever the key matched a stored row, valid or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult<T> {
    pub valid: bool,
    pub reason: Option<InvalidReason>,
    pub record: Option<T>,
}

impl<T> ValidationResult<T> {
    pub fn valid(record: T) -> Self {
        Self {
            valid: true,
            reason: None,
            record: Some(record),
        }
    }

    pub fn invalid(record: T, reason: InvalidReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            record: Some(record),
        }
    }

    pub fn not_found() -> Self {
        Self {
            valid: false,
            reason: Some(InvalidReason::NotFound),
            record: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ValidationResult<U> {
        ValidationResult {
            valid: self.valid,
            reason: self.reason,
            record: self.record.map(f),
        }
    }
}
