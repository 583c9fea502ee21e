//! Employee feedback and HR info requests. Info requests move from
//! `SUBMITTED` to `RESOLVED`; feedback is write-once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::helpdesk::{Feedback, InfoRequest, NewFeedback, NewInfoRequest};
use crate::repo::Store;
use crate::utils::username_cache::UsernameCache;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FeedbackInput {
    #[schema(example = "The new shift calendar is much easier to read.")]
    pub feedback: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InfoRequestInput {
    #[schema(example = "Salary Slip")]
    pub request_type: String,
    #[schema(example = "March 2024, for a bank loan")]
    pub request_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedbackEntry {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InfoRequestEntry {
    #[serde(flatten)]
    pub request: InfoRequest,
    pub username: String,
}

fn required_text(label: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{label} must not be empty")));
    }
    Ok(value.to_string())
}

pub struct Helpdesk {
    store: Arc<dyn Store>,
    usernames: UsernameCache,
}

impl Helpdesk {
    pub fn new(store: Arc<dyn Store>, usernames: UsernameCache) -> Self {
        Self { store, usernames }
    }

    #[instrument(name = "helpdesk_feedback", skip(self, input))]
    pub async fn submit_feedback(
        &self,
        employee_id: u64,
        input: FeedbackInput,
    ) -> ServiceResult<Feedback> {
        let feedback = required_text("Feedback", &input.feedback)?;
        let stored = self
            .store
            .insert_feedback(NewFeedback {
                employee_id,
                feedback,
            })
            .await?;
        info!(feedback_id = stored.id, "Feedback submitted");
        Ok(stored)
    }

    /// All feedback, newest first, with author usernames.
    pub async fn list_feedback(&self) -> ServiceResult<Vec<FeedbackEntry>> {
        let mut out = Vec::new();
        for feedback in self.store.list_feedback().await? {
            let username = self
                .usernames
                .username_of(self.store.as_ref(), feedback.employee_id)
                .await?;
            out.push(FeedbackEntry { feedback, username });
        }
        Ok(out)
    }

    #[instrument(name = "helpdesk_info_request", skip(self, input))]
    pub async fn submit_info_request(
        &self,
        employee_id: u64,
        input: InfoRequestInput,
    ) -> ServiceResult<InfoRequest> {
        let request_type = required_text("Request type", &input.request_type)?;
        let request_description = input
            .request_description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let stored = self
            .store
            .insert_info_request(NewInfoRequest {
                employee_id,
                request_type,
                request_description,
            })
            .await?;
        info!(info_request_id = stored.id, "Info request submitted");
        Ok(stored)
    }

    /// All info requests, newest first, with requester usernames.
    pub async fn list_info_requests(&self) -> ServiceResult<Vec<InfoRequestEntry>> {
        let mut out = Vec::new();
        for request in self.store.list_info_requests().await? {
            let username = self
                .usernames
                .username_of(self.store.as_ref(), request.employee_id)
                .await?;
            out.push(InfoRequestEntry { request, username });
        }
        Ok(out)
    }

    /// Resolving an already resolved request is a no-op.
    #[instrument(name = "helpdesk_resolve", skip(self))]
    pub async fn resolve_info_request(&self, id: u64) -> ServiceResult<InfoRequest> {
        let resolved = self
            .store
            .resolve_info_request(id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Info request",
                id,
            })?;
        info!("Info request resolved");
        Ok(resolved)
    }
}
