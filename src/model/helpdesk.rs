use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 4,
    "employee_id": 3,
    "feedback": "The new shift calendar is much easier to read."
}))]
pub struct Feedback {
    pub id: u64,
    pub employee_id: u64,
    pub feedback: String,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub employee_id: u64,
    pub feedback: String,
}

impl NewFeedback {
    pub fn with_id(self, id: u64) -> Feedback {
        Feedback {
            id,
            employee_id: self.employee_id,
            feedback: self.feedback,
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InfoRequestStatus {
    Submitted,
    Resolved,
}

/// A request for a document or piece of information from HR, such as a
/// salary slip.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 9,
    "employee_id": 3,
    "request_type": "Salary Slip",
    "request_description": "March 2024, for a bank loan",
    "status": "SUBMITTED"
}))]
pub struct InfoRequest {
    pub id: u64,
    pub employee_id: u64,
    pub request_type: String,
    pub request_description: Option<String>,
    pub status: InfoRequestStatus,
}

#[derive(Debug, Clone)]
pub struct NewInfoRequest {
    pub employee_id: u64,
    pub request_type: String,
    pub request_description: Option<String>,
}

impl NewInfoRequest {
    pub fn with_id(self, id: u64) -> InfoRequest {
        InfoRequest {
            id,
            employee_id: self.employee_id,
            request_type: self.request_type,
            request_description: self.request_description,
            status: InfoRequestStatus::Submitted,
        }
    }
}
