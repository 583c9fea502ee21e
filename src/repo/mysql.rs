use std::str::FromStr;

use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use super::{DecisionWrite, EmployeeUpdate, Store, StoreError, StoreResult};
use crate::model::attendance::{
    AttendanceRequest, LeaveCategory, NewAttendanceRequest, RequestStatus,
};
use crate::model::employee::{Employee, LeaveBalances, NewEmployee};
use crate::model::helpdesk::{
    Feedback, InfoRequest, InfoRequestStatus, NewFeedback, NewInfoRequest,
};
use crate::model::role::Role;

const EMPLOYEE_COLUMNS: &str = r#"
    id, username, password_hash, role, reporting_manager_id, is_active,
    mobile_number, age, joining_date, experience, department, employment_type,
    sick_leave_balance, casual_leave_balance, earned_leave_balance
"#;

const REQUEST_COLUMNS: &str = r#"
    id, employee_id, reporting_manager_id, kind, category, start_date, end_date,
    status, employee_comment, manager_comment
"#;

const INFO_REQUEST_COLUMNS: &str = "id, employee_id, request_type, request_description, status";

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    username: String,
    password_hash: String,
    role: String,
    reporting_manager_id: Option<u64>,
    is_active: bool,
    mobile_number: Option<String>,
    age: Option<u32>,
    joining_date: Option<NaiveDate>,
    experience: Option<f64>,
    department: Option<String>,
    employment_type: Option<String>,
    sick_leave_balance: u32,
    casual_leave_balance: u32,
    earned_leave_balance: u32,
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    reporting_manager_id: Option<u64>,
    kind: String,
    category: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    employee_comment: Option<String>,
    manager_comment: Option<String>,
}

#[derive(FromRow)]
struct FeedbackRow {
    id: u64,
    employee_id: u64,
    feedback: String,
}

#[derive(FromRow)]
struct InfoRequestRow {
    id: u64,
    employee_id: u64,
    request_type: String,
    request_description: Option<String>,
    status: String,
}

/// Counter column drawn by `category`; LWP has none.
fn balance_column(category: LeaveCategory) -> Option<&'static str> {
    match category {
        LeaveCategory::Sick => Some("sick_leave_balance"),
        LeaveCategory::Casual => Some("casual_leave_balance"),
        LeaveCategory::Earned => Some("earned_leave_balance"),
        LeaveCategory::Lwp => None,
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} = {value:?}")))
}

fn parse_optional<T: FromStr>(column: &str, value: Option<String>) -> StoreResult<Option<T>> {
    value.map(|v| parse_column(column, &v)).transpose()
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> StoreResult<Self> {
        Ok(Employee {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: parse_column("role", &row.role)?,
            reporting_manager_id: row.reporting_manager_id,
            is_active: row.is_active,
            mobile_number: row.mobile_number,
            age: row.age,
            joining_date: row.joining_date,
            experience: row.experience,
            department: parse_optional("department", row.department)?,
            employment_type: parse_optional("employment_type", row.employment_type)?,
            balances: LeaveBalances {
                sick: row.sick_leave_balance,
                casual: row.casual_leave_balance,
                earned: row.earned_leave_balance,
            },
        })
    }
}

impl TryFrom<RequestRow> for AttendanceRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> StoreResult<Self> {
        if row.start_date > row.end_date {
            return Err(StoreError::Corrupt(format!("request {} ends before it starts", row.id)));
        }
        Ok(AttendanceRequest {
            id: row.id,
            employee_id: row.employee_id,
            reporting_manager_id: row.reporting_manager_id,
            kind: parse_column("kind", &row.kind)?,
            category: parse_optional("category", row.category)?,
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse_column("status", &row.status)?,
            employee_comment: row.employee_comment,
            manager_comment: row.manager_comment,
        })
    }
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Feedback {
            id: row.id,
            employee_id: row.employee_id,
            feedback: row.feedback,
        }
    }
}

impl TryFrom<InfoRequestRow> for InfoRequest {
    type Error = StoreError;

    fn try_from(row: InfoRequestRow) -> StoreResult<Self> {
        Ok(InfoRequest {
            id: row.id,
            employee_id: row.employee_id,
            request_type: row.request_type,
            request_description: row.request_description,
            status: parse_column("status", &row.status)?,
        })
    }
}

fn employees(rows: Vec<EmployeeRow>) -> StoreResult<Vec<Employee>> {
    rows.into_iter().map(Employee::try_from).collect()
}

fn requests(rows: Vec<RequestRow>) -> StoreResult<Vec<AttendanceRequest>> {
    rows.into_iter().map(AttendanceRequest::try_from).collect()
}

/// MySQL-backed store. Multi-statement writes run inside one transaction
/// and lock the rows they guard with `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn fetch_employee_by_username(&self, username: &str) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE username = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn fetch_employees(&self, role: Option<Role>) -> StoreResult<Vec<Employee>> {
        let rows = match role {
            Some(role) => {
                let sql = format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE role = ? ORDER BY id DESC"
                );
                sqlx::query_as::<_, EmployeeRow>(&sql)
                    .bind(role.to_string())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id DESC");
                sqlx::query_as::<_, EmployeeRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        employees(rows)
    }

    async fn create_employee(&self, employee: NewEmployee) -> StoreResult<Employee> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
                (username, password_hash, role, reporting_manager_id, is_active,
                 mobile_number, age, joining_date, experience, department, employment_type,
                 sick_leave_balance, casual_leave_balance, earned_leave_balance)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.username)
        .bind(&employee.password_hash)
        .bind(employee.role.to_string())
        .bind(employee.reporting_manager_id)
        .bind(employee.is_active)
        .bind(&employee.mobile_number)
        .bind(employee.age)
        .bind(employee.joining_date)
        .bind(employee.experience)
        .bind(employee.department.map(|d| d.to_string()))
        .bind(employee.employment_type.map(|t| t.to_string()))
        .bind(employee.balances.sick)
        .bind(employee.balances.casual)
        .bind(employee.balances.earned)
        .execute(&self.pool)
        .await?;

        Ok(employee.with_id(result.last_insert_id()))
    }

    async fn save_employee(&self, update: EmployeeUpdate) -> StoreResult<Option<Employee>> {
        let EmployeeUpdate { employee, balances } = update;
        let mut tx = self.pool.begin().await?;

        let exists =
            sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
                .bind(employee.id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
        if !exists {
            return Ok(None);
        }

        // balance columns keep their stored value unless explicitly overridden
        sqlx::query(
            r#"
            UPDATE employees SET
                username = ?, password_hash = ?, role = ?, reporting_manager_id = ?,
                is_active = ?, mobile_number = ?, age = ?, joining_date = ?, experience = ?,
                department = ?, employment_type = ?,
                sick_leave_balance = COALESCE(?, sick_leave_balance),
                casual_leave_balance = COALESCE(?, casual_leave_balance),
                earned_leave_balance = COALESCE(?, earned_leave_balance)
            WHERE id = ?
            "#,
        )
        .bind(&employee.username)
        .bind(&employee.password_hash)
        .bind(employee.role.to_string())
        .bind(employee.reporting_manager_id)
        .bind(employee.is_active)
        .bind(&employee.mobile_number)
        .bind(employee.age)
        .bind(employee.joining_date)
        .bind(employee.experience)
        .bind(employee.department.map(|d| d.to_string()))
        .bind(employee.employment_type.map(|t| t.to_string()))
        .bind(balances.sick)
        .bind(balances.casual)
        .bind(balances.earned)
        .bind(employee.id)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        let stored = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(employee.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Employee::try_from(stored).map(Some)
    }

    async fn remove_employee(&self, id: u64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let exists =
            sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
        if !exists {
            return Ok(false);
        }

        let owned: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attendance_requests WHERE employee_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if owned > 0 {
            return Err(StoreError::StaleState);
        }

        sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn fetch_request(&self, id: u64) -> StoreResult<Option<AttendanceRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM attendance_requests WHERE id = ?");
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRequest::try_from)
            .transpose()
    }

    async fn fetch_requests_for_employee(
        &self,
        employee_id: u64,
    ) -> StoreResult<Vec<AttendanceRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM attendance_requests WHERE employee_id = ? ORDER BY id DESC"
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        requests(rows)
    }

    async fn fetch_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> StoreResult<Vec<AttendanceRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM attendance_requests WHERE status = ? ORDER BY id DESC"
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;
        requests(rows)
    }

    async fn overlap_exists<'e, E>(
        executor: E,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<bool>
    where
        E: sqlx::Executor<'e, Database = sqlx::MySql>,
    {
        let found: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM attendance_requests
                WHERE employee_id = ?
                AND status <> 'REJECTED'
                AND start_date <= ?
                AND end_date >= ?
            )
            "#,
        )
        .bind(employee_id)
        .bind(end)
        .bind(start)
        .fetch_one(executor)
        .await?;

        Ok(found != 0)
    }

    async fn create_request(
        &self,
        request: NewAttendanceRequest,
    ) -> StoreResult<AttendanceRequest> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent submissions for the same employee.
        sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(request.employee_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::StaleState)?;

        if Self::overlap_exists(
            &mut *tx,
            request.employee_id,
            request.range.start(),
            request.range.end(),
        )
        .await?
        {
            return Err(StoreError::StaleState);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO attendance_requests
                (employee_id, reporting_manager_id, kind, category, start_date, end_date,
                 status, employee_comment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.reporting_manager_id)
        .bind(request.kind.to_string())
        .bind(request.category.map(|c| c.to_string()))
        .bind(request.range.start())
        .bind(request.range.end())
        .bind(RequestStatus::Pending.to_string())
        .bind(&request.employee_comment)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let id = result.last_insert_id();
        debug!(request_id = id, employee_id = request.employee_id, "Request row inserted");
        Ok(request.with_id(id))
    }

    async fn apply_decision(&self, write: DecisionWrite) -> StoreResult<AttendanceRequest> {
        let mut tx = self.pool.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM attendance_requests WHERE id = ? FOR UPDATE")
                .bind(write.request.id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::StaleState)?;
        if parse_column::<RequestStatus>("status", &current)? != write.expected_status {
            return Err(StoreError::StaleState);
        }

        if let Some(deduction) = write.deduction {
            if let Some(column) = balance_column(deduction.category) {
                // read under the row lock so a deduction from another process
                // committed meanwhile is seen here
                let sql = format!("SELECT {column} FROM employees WHERE id = ? FOR UPDATE");
                let available: u32 = sqlx::query_scalar(&sql)
                    .bind(deduction.employee_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(StoreError::StaleState)?;
                if available < deduction.days {
                    return Err(StoreError::Exhausted { available });
                }

                let sql = format!("UPDATE employees SET {column} = {column} - ? WHERE id = ?");
                sqlx::query(&sql)
                    .bind(deduction.days)
                    .bind(deduction.employee_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE attendance_requests
            SET status = ?, manager_comment = ?
            WHERE id = ?
            "#,
        )
        .bind(write.request.status.to_string())
        .bind(&write.request.manager_comment)
        .bind(write.request.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(write.request)
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> StoreResult<Feedback> {
        let result = sqlx::query("INSERT INTO feedback (employee_id, feedback) VALUES (?, ?)")
            .bind(feedback.employee_id)
            .bind(&feedback.feedback)
            .execute(&self.pool)
            .await?;
        Ok(feedback.with_id(result.last_insert_id()))
    }

    async fn fetch_feedback(&self) -> StoreResult<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT id, employee_id, feedback FROM feedback ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Feedback::from).collect())
    }

    async fn create_info_request(&self, request: NewInfoRequest) -> StoreResult<InfoRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO info_requests (employee_id, request_type, request_description, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(&request.request_type)
        .bind(&request.request_description)
        .bind(InfoRequestStatus::Submitted.to_string())
        .execute(&self.pool)
        .await?;
        Ok(request.with_id(result.last_insert_id()))
    }

    async fn fetch_info_requests(&self) -> StoreResult<Vec<InfoRequest>> {
        let sql = format!("SELECT {INFO_REQUEST_COLUMNS} FROM info_requests ORDER BY id DESC");
        let rows = sqlx::query_as::<_, InfoRequestRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(InfoRequest::try_from).collect()
    }

    async fn mark_info_request_resolved(&self, id: u64) -> StoreResult<Option<InfoRequest>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE info_requests SET status = ? WHERE id = ?")
            .bind(InfoRequestStatus::Resolved.to_string())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("SELECT {INFO_REQUEST_COLUMNS} FROM info_requests WHERE id = ?");
        let row = sqlx::query_as::<_, InfoRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        row.map(InfoRequest::try_from).transpose()
    }
}

impl Store for MySqlStore {
    fn find_employee(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<Employee>>> {
        self.fetch_employee(id).boxed()
    }

    fn find_employee_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Employee>>> {
        self.fetch_employee_by_username(username).boxed()
    }

    fn list_employees(&self, role: Option<Role>) -> BoxFuture<'_, StoreResult<Vec<Employee>>> {
        self.fetch_employees(role).boxed()
    }

    fn insert_employee(&self, employee: NewEmployee) -> BoxFuture<'_, StoreResult<Employee>> {
        self.create_employee(employee).boxed()
    }

    fn update_employee(
        &self,
        update: EmployeeUpdate,
    ) -> BoxFuture<'_, StoreResult<Option<Employee>>> {
        self.save_employee(update).boxed()
    }

    fn delete_employee(&self, id: u64) -> BoxFuture<'_, StoreResult<bool>> {
        self.remove_employee(id).boxed()
    }

    fn find_request(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<AttendanceRequest>>> {
        self.fetch_request(id).boxed()
    }

    fn requests_for_employee(
        &self,
        employee_id: u64,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceRequest>>> {
        self.fetch_requests_for_employee(employee_id).boxed()
    }

    fn requests_by_status(
        &self,
        status: RequestStatus,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceRequest>>> {
        self.fetch_requests_by_status(status).boxed()
    }

    fn has_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, StoreResult<bool>> {
        Self::overlap_exists(&self.pool, employee_id, start, end).boxed()
    }

    fn insert_request(
        &self,
        request: NewAttendanceRequest,
    ) -> BoxFuture<'_, StoreResult<AttendanceRequest>> {
        self.create_request(request).boxed()
    }

    fn commit_decision(
        &self,
        write: DecisionWrite,
    ) -> BoxFuture<'_, StoreResult<AttendanceRequest>> {
        self.apply_decision(write).boxed()
    }

    fn insert_feedback(&self, feedback: NewFeedback) -> BoxFuture<'_, StoreResult<Feedback>> {
        self.create_feedback(feedback).boxed()
    }

    fn list_feedback(&self) -> BoxFuture<'_, StoreResult<Vec<Feedback>>> {
        self.fetch_feedback().boxed()
    }

    fn insert_info_request(
        &self,
        request: NewInfoRequest,
    ) -> BoxFuture<'_, StoreResult<InfoRequest>> {
        self.create_info_request(request).boxed()
    }

    fn list_info_requests(&self) -> BoxFuture<'_, StoreResult<Vec<InfoRequest>>> {
        self.fetch_info_requests().boxed()
    }

    fn resolve_info_request(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<InfoRequest>>> {
        self.mark_info_request_resolved(id).boxed()
    }
}
