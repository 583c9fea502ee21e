use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    AttendanceAdjustment,
    Leave,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveCategory {
    Sick,
    Casual,
    Earned,
    /// Leave without pay: unlimited, never drawn from a balance.
    Lwp,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outcome a manager may record on a pending request.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for RequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => RequestStatus::Approved,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}

/// Inclusive calendar range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `start` falls after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> u32 {
        let span = (self.end - self.start).num_days() + 1;
        u32::try_from(span).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 12,
        "employee_id": 3,
        "reporting_manager_id": 2,
        "kind": "LEAVE",
        "category": "SICK",
        "start_date": "2024-01-01",
        "end_date": "2024-01-03",
        "status": "PENDING",
        "employee_comment": "flu",
        "manager_comment": null
    })
)]
pub struct AttendanceRequest {
    pub id: u64,
    pub employee_id: u64,
    /// Snapshot of the owner's reporting manager taken at submission.
    pub reporting_manager_id: Option<u64>,
    pub kind: RequestKind,
    pub category: Option<LeaveCategory>,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub status: RequestStatus,
    pub employee_comment: Option<String>,
    pub manager_comment: Option<String>,
}

impl AttendanceRequest {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// A validated submission, ready to be stored as PENDING.
#[derive(Debug, Clone)]
pub struct NewAttendanceRequest {
    pub employee_id: u64,
    pub reporting_manager_id: Option<u64>,
    pub kind: RequestKind,
    pub category: Option<LeaveCategory>,
    pub range: DateRange,
    pub employee_comment: Option<String>,
}

impl NewAttendanceRequest {
    pub fn with_id(self, id: u64) -> AttendanceRequest {
        AttendanceRequest {
            id,
            employee_id: self.employee_id,
            reporting_manager_id: self.reporting_manager_id,
            kind: self.kind,
            category: self.category,
            start_date: self.range.start(),
            end_date: self.range.end(),
            status: RequestStatus::Pending,
            employee_comment: self.employee_comment,
            manager_comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_rejects_start_after_end() {
        assert!(DateRange::new(date(2024, 2, 10), date(2024, 2, 1)).is_none());
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 2, 1)).is_some());
    }

    #[test]
    fn days_are_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        assert_eq!(range.days(), 3);
        let single = DateRange::new(date(2024, 3, 5), date(2024, 3, 5)).unwrap();
        assert_eq!(single.days(), 1);
    }

    #[test]
    fn decision_parses_any_case() {
        assert_eq!("approved".parse::<Decision>().ok(), Some(Decision::Approved));
        assert_eq!("REJECTED".parse::<Decision>().ok(), Some(Decision::Rejected));
        assert!("pending".parse::<Decision>().is_err());
    }
}
