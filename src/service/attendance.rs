//! Attendance/leave request lifecycle.
//!
//! `PENDING` is the only state a decision can leave. `APPROVED` is always
//! terminal; `REJECTED` is terminal unless [`DecisionPolicy`] allows
//! reopening it. Balance is deducted once, on the transition to
//! `APPROVED` of a `LEAVE` request in a balance-bearing category.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{
    AttendanceRequest, DateRange, Decision, LeaveCategory, NewAttendanceRequest, RequestKind,
    RequestStatus,
};
use crate::model::employee::Employee;
use crate::repo::{DecisionWrite, Deduction, Store, StoreError};
use crate::utils::keyed_lock::KeyedLocks;
use crate::utils::username_cache::UsernameCache;

#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPolicy {
    /// Let a manager decide again on a request that was rejected.
    pub allow_redecide_rejected: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "kind": "LEAVE",
    "category": "SICK",
    "start_date": "2024-01-01",
    "end_date": "2024-01-03",
    "employee_comment": "flu"
}))]
pub struct Submission {
    pub kind: RequestKind,
    /// Required for `LEAVE`, discarded for `ATTENDANCE_ADJUSTMENT`.
    pub category: Option<LeaveCategory>,
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    pub employee_comment: Option<String>,
}

/// A pending request joined with its requester's username.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingRequest {
    #[serde(flatten)]
    pub request: AttendanceRequest,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerScope {
    All,
    /// Only requests whose snapshotted reporting manager is this id.
    ReportsTo(u64),
}

pub struct AttendanceService {
    store: Arc<dyn Store>,
    locks: KeyedLocks,
    usernames: UsernameCache,
    policy: DecisionPolicy,
}

impl AttendanceService {
    /// `locks` must be shared with every other writer of employee rows.
    pub fn new(
        store: Arc<dyn Store>,
        usernames: UsernameCache,
        locks: KeyedLocks,
        policy: DecisionPolicy,
    ) -> Self {
        Self {
            store,
            locks,
            usernames,
            policy,
        }
    }

    async fn employee(&self, id: u64) -> ServiceResult<Employee> {
        self.store
            .find_employee(id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Employee",
                id,
            })
    }

    async fn request(&self, id: u64) -> ServiceResult<AttendanceRequest> {
        self.store
            .find_request(id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Request",
                id,
            })
    }

    fn conflict() -> ServiceError {
        ServiceError::Conflict("Conflict: Request exists for these dates.".into())
    }

    /// Validates and stores a new PENDING request for `employee_id`.
    /// Balances are only checked here, never deducted.
    #[instrument(name = "attendance_submit", skip(self, submission), fields(kind = %submission.kind))]
    pub async fn submit(
        &self,
        employee_id: u64,
        submission: Submission,
    ) -> ServiceResult<AttendanceRequest> {
        let (start, end) = match (submission.start_date, submission.end_date) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ServiceError::validation("Dates are required.")),
        };
        let range = DateRange::new(start, end)
            .ok_or_else(|| ServiceError::validation("Start date cannot be after end date."))?;

        let _guard = self.locks.lock(employee_id).await;

        let employee = self.employee(employee_id).await?;

        let category = match submission.kind {
            RequestKind::Leave => {
                let category = submission.category.ok_or_else(|| {
                    ServiceError::validation("Please select a Leave Category (Sick, Casual, etc).")
                })?;
                employee.balances.check_sufficient(category, range.days())?;
                Some(category)
            }
            RequestKind::AttendanceAdjustment => None,
        };

        if self
            .store
            .has_overlap(employee_id, range.start(), range.end())
            .await?
        {
            info!(%start, %end, "Submission overlaps an existing request");
            return Err(Self::conflict());
        }

        let stored = self
            .store
            .insert_request(NewAttendanceRequest {
                employee_id,
                reporting_manager_id: employee.reporting_manager_id,
                kind: submission.kind,
                category,
                range,
                employee_comment: submission.employee_comment,
            })
            .await
            .map_err(|e| match e {
                StoreError::StaleState => Self::conflict(),
                other => other.into(),
            })?;

        info!(request_id = stored.id, days = range.days(), "Request submitted");
        Ok(stored)
    }

    fn ensure_decidable(&self, request: &AttendanceRequest) -> ServiceResult<()> {
        match request.status {
            RequestStatus::Pending => Ok(()),
            RequestStatus::Approved => Err(ServiceError::InvalidTransition(
                "Request is already approved.".into(),
            )),
            RequestStatus::Rejected if self.policy.allow_redecide_rejected => Ok(()),
            RequestStatus::Rejected => Err(ServiceError::InvalidTransition(
                "Request is already rejected.".into(),
            )),
        }
    }

    /// Records a manager decision. Approving leave deducts the owner's
    /// balance in the same store write as the status change.
    #[instrument(name = "attendance_decide", skip(self, decision, manager_comment), fields(decision = %decision))]
    pub async fn decide(
        &self,
        request_id: u64,
        decision: Decision,
        manager_comment: Option<String>,
    ) -> ServiceResult<AttendanceRequest> {
        let owner_id = self.request(request_id).await?.employee_id;
        let _guard = self.locks.lock(owner_id).await;

        // re-read under the owner's lock
        let mut request = self.request(request_id).await?;
        self.ensure_decidable(&request)?;

        let expected_status = request.status;
        let approving = decision == Decision::Approved;

        if approving
            && expected_status == RequestStatus::Rejected
            && self
                .store
                .has_overlap(request.employee_id, request.start_date, request.end_date)
                .await?
        {
            return Err(Self::conflict());
        }

        let mut deduction = None;
        if approving && request.kind == RequestKind::Leave {
            let category = request.category.ok_or_else(|| {
                StoreError::Corrupt(format!("leave request {request_id} has no category"))
            })?;
            let owner = self.employee(request.employee_id).await?;
            let days = request.range().days();
            owner.balances.check_sufficient(category, days)?;
            if category.draws_balance() {
                deduction = Some(Deduction {
                    employee_id: owner.id,
                    category,
                    days,
                });
            }
        }

        request.status = decision.into();
        request.manager_comment = Some(manager_comment.unwrap_or_default());

        let updated = self
            .store
            .commit_decision(DecisionWrite {
                request,
                expected_status,
                deduction,
            })
            .await
            .map_err(|e| match (e, deduction) {
                (StoreError::StaleState, _) => {
                    warn!("Request changed while the decision was being applied");
                    ServiceError::InvalidTransition("Request was decided concurrently.".into())
                }
                (StoreError::Exhausted { available }, Some(d)) => {
                    warn!(available, "Balance drawn down while the decision was being applied");
                    ServiceError::InsufficientBalance {
                        category: d.category,
                        available,
                        requested: d.days,
                    }
                }
                (other, _) => other.into(),
            })?;

        info!(status = %updated.status, "Request decided");
        Ok(updated)
    }

    /// PENDING requests, newest first, with requester usernames.
    pub async fn list_pending(&self, scope: ManagerScope) -> ServiceResult<Vec<PendingRequest>> {
        let pending = self.store.requests_by_status(RequestStatus::Pending).await?;

        let mut out = Vec::with_capacity(pending.len());
        for request in pending {
            if let ManagerScope::ReportsTo(manager_id) = scope {
                if request.reporting_manager_id != Some(manager_id) {
                    continue;
                }
            }
            let username = self
                .usernames
                .username_of(self.store.as_ref(), request.employee_id)
                .await?;
            out.push(PendingRequest { request, username });
        }
        Ok(out)
    }

    /// The employee's own requests, newest first.
    pub async fn history(&self, employee_id: u64) -> ServiceResult<Vec<AttendanceRequest>> {
        Ok(self.store.requests_for_employee(employee_id).await?)
    }

    /// Read-only "can I apply for these dates" check.
    pub async fn has_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<bool> {
        let range = DateRange::new(start, end)
            .ok_or_else(|| ServiceError::validation("Start date cannot be after end date."))?;
        Ok(self
            .store
            .has_overlap(employee_id, range.start(), range.end())
            .await?)
    }
}
