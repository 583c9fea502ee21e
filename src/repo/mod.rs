//! Storage seam for employees and attendance requests.
//!
//! Every method returns a boxed future so the engine can hold an
//! `Arc<dyn Store>` and swap MySQL for the in-memory store in tests.

use chrono::NaiveDate;
use derive_more::Display;
use futures::future::BoxFuture;

use crate::model::attendance::{
    AttendanceRequest, LeaveCategory, NewAttendanceRequest, RequestStatus,
};
use crate::model::employee::{BalancePatch, Employee, NewEmployee};
use crate::model::helpdesk::{Feedback, InfoRequest, NewFeedback, NewInfoRequest};
use crate::model::role::Role;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    /// A guarded write found the row in a different state than expected.
    #[display(fmt = "stored state changed underneath the write")]
    StaleState,

    #[display(fmt = "unique value already taken: {}", _0)]
    Duplicate(String),

    /// A deduction found fewer days left than it needed.
    #[display(fmt = "balance exhausted, {} day(s) left", available)]
    Exhausted { available: u32 },

    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // MySQL integrity violation (duplicate key, FK)
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Duplicate(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A profile write. Balance counters are written only where `balances`
/// names them, so a concurrent deduction is never overwritten.
#[derive(Debug, Clone)]
pub struct EmployeeUpdate {
    pub employee: Employee,
    pub balances: BalancePatch,
}

/// Days to take off one counter, applied against the stored balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub employee_id: u64,
    pub category: LeaveCategory,
    pub days: u32,
}

/// The writes a manager decision produces, applied as one unit.
#[derive(Debug, Clone)]
pub struct DecisionWrite {
    /// The request carrying its new status and manager comment.
    pub request: AttendanceRequest,
    /// Status the stored row must still have for the write to apply.
    pub expected_status: RequestStatus,
    /// Present when the decision approves balance-bearing leave. Fails the
    /// whole write with `Exhausted` if the stored counter is too low.
    pub deduction: Option<Deduction>,
}

pub trait Store: Send + Sync {
    // -------------------------
    // Employees
    // -------------------------
    fn find_employee(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<Employee>>>;

    fn find_employee_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Employee>>>;

    /// Newest first; `None` lists every role.
    fn list_employees(&self, role: Option<Role>) -> BoxFuture<'_, StoreResult<Vec<Employee>>>;

    fn insert_employee(&self, employee: NewEmployee) -> BoxFuture<'_, StoreResult<Employee>>;

    /// Returns the stored row after the write, `None` when no row has that id.
    fn update_employee(
        &self,
        update: EmployeeUpdate,
    ) -> BoxFuture<'_, StoreResult<Option<Employee>>>;

    /// Returns `false` when no row has that id. Fails with `StaleState`
    /// while requests still reference the employee.
    fn delete_employee(&self, id: u64) -> BoxFuture<'_, StoreResult<bool>>;

    // -------------------------
    // Attendance requests
    // -------------------------
    fn find_request(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<AttendanceRequest>>>;

    /// Newest first.
    fn requests_for_employee(
        &self,
        employee_id: u64,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceRequest>>>;

    /// Newest first.
    fn requests_by_status(
        &self,
        status: RequestStatus,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceRequest>>>;

    /// True when any non-rejected request of the employee shares a day
    /// with `[start, end]`.
    fn has_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, StoreResult<bool>>;

    /// Persists a PENDING request. Re-checks overlap inside the write and
    /// fails with `StaleState` if a blocking request appeared meanwhile.
    fn insert_request(
        &self,
        request: NewAttendanceRequest,
    ) -> BoxFuture<'_, StoreResult<AttendanceRequest>>;

    /// Applies a decision atomically. Fails with `StaleState` when the
    /// stored status no longer equals `expected_status`.
    fn commit_decision(&self, write: DecisionWrite)
    -> BoxFuture<'_, StoreResult<AttendanceRequest>>;

    // -------------------------
    // Feedback and info requests
    // -------------------------
    fn insert_feedback(&self, feedback: NewFeedback) -> BoxFuture<'_, StoreResult<Feedback>>;

    /// Newest first.
    fn list_feedback(&self) -> BoxFuture<'_, StoreResult<Vec<Feedback>>>;

    fn insert_info_request(
        &self,
        request: NewInfoRequest,
    ) -> BoxFuture<'_, StoreResult<InfoRequest>>;

    /// Newest first.
    fn list_info_requests(&self) -> BoxFuture<'_, StoreResult<Vec<InfoRequest>>>;

    /// Marks the request RESOLVED. `None` when no row has that id.
    fn resolve_info_request(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<InfoRequest>>>;
}
