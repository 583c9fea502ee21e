use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;
use futures::future::{self, BoxFuture, FutureExt};

use super::{DecisionWrite, EmployeeUpdate, Store, StoreError, StoreResult};
use crate::model::attendance::{AttendanceRequest, NewAttendanceRequest, RequestStatus};
use crate::model::employee::{Employee, NewEmployee};
use crate::model::helpdesk::{
    Feedback, InfoRequest, InfoRequestStatus, NewFeedback, NewInfoRequest,
};
use crate::model::role::Role;
use crate::service::overlap::ranges_overlap;

#[derive(Default)]
struct Tables {
    employees: BTreeMap<u64, Employee>,
    requests: BTreeMap<u64, AttendanceRequest>,
    feedback: BTreeMap<u64, Feedback>,
    info_requests: BTreeMap<u64, InfoRequest>,
    next_employee_id: u64,
    next_request_id: u64,
    next_feedback_id: u64,
    next_info_request_id: u64,
}

impl Tables {
    fn overlaps(&self, employee_id: u64, start: NaiveDate, end: NaiveDate) -> bool {
        self.requests.values().any(|r| {
            r.employee_id == employee_id
                && r.status != RequestStatus::Rejected
                && ranges_overlap(r.start_date, r.end_date, start, end)
        })
    }
}

/// Process-local store. Each write holds the table lock for its whole
/// duration, which makes every trait method a single atomic unit.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut guard = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

fn ready<'a, T: Send + 'a>(value: StoreResult<T>) -> BoxFuture<'a, StoreResult<T>> {
    future::ready(value).boxed()
}

impl Store for MemoryStore {
    fn find_employee(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<Employee>>> {
        ready(Ok(self.read(|t| t.employees.get(&id).cloned())))
    }

    fn find_employee_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Employee>>> {
        ready(Ok(self.read(|t| {
            t.employees
                .values()
                .find(|e| e.username.eq_ignore_ascii_case(username))
                .cloned()
        })))
    }

    fn list_employees(&self, role: Option<Role>) -> BoxFuture<'_, StoreResult<Vec<Employee>>> {
        ready(Ok(self.read(|t| {
            t.employees
                .values()
                .rev()
                .filter(|e| role.is_none_or(|r| e.role == r))
                .cloned()
                .collect()
        })))
    }

    fn insert_employee(&self, employee: NewEmployee) -> BoxFuture<'_, StoreResult<Employee>> {
        ready(self.write(|t| {
            if t.employees
                .values()
                .any(|e| e.username.eq_ignore_ascii_case(&employee.username))
            {
                return Err(StoreError::Duplicate(employee.username));
            }
            t.next_employee_id += 1;
            let stored = employee.with_id(t.next_employee_id);
            t.employees.insert(stored.id, stored.clone());
            Ok(stored)
        }))
    }

    fn update_employee(
        &self,
        update: EmployeeUpdate,
    ) -> BoxFuture<'_, StoreResult<Option<Employee>>> {
        ready(self.write(|t| {
            let EmployeeUpdate {
                mut employee,
                balances,
            } = update;
            if t.employees.values().any(|e| {
                e.id != employee.id && e.username.eq_ignore_ascii_case(&employee.username)
            }) {
                return Err(StoreError::Duplicate(employee.username));
            }
            let Some(slot) = t.employees.get_mut(&employee.id) else {
                return Ok(None);
            };
            employee.balances = slot.balances;
            balances.apply(&mut employee.balances);
            *slot = employee.clone();
            Ok(Some(employee))
        }))
    }

    fn delete_employee(&self, id: u64) -> BoxFuture<'_, StoreResult<bool>> {
        ready(self.write(|t| {
            if !t.employees.contains_key(&id) {
                return Ok(false);
            }
            if t.requests.values().any(|r| r.employee_id == id) {
                return Err(StoreError::StaleState);
            }
            t.employees.remove(&id);
            Ok(true)
        }))
    }

    fn find_request(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<AttendanceRequest>>> {
        ready(Ok(self.read(|t| t.requests.get(&id).cloned())))
    }

    fn requests_for_employee(
        &self,
        employee_id: u64,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceRequest>>> {
        ready(Ok(self.read(|t| {
            t.requests
                .values()
                .rev()
                .filter(|r| r.employee_id == employee_id)
                .cloned()
                .collect()
        })))
    }

    fn requests_by_status(
        &self,
        status: RequestStatus,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceRequest>>> {
        ready(Ok(self.read(|t| {
            t.requests
                .values()
                .rev()
                .filter(|r| r.status == status)
                .cloned()
                .collect()
        })))
    }

    fn has_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, StoreResult<bool>> {
        ready(Ok(self.read(|t| t.overlaps(employee_id, start, end))))
    }

    fn insert_request(
        &self,
        request: NewAttendanceRequest,
    ) -> BoxFuture<'_, StoreResult<AttendanceRequest>> {
        ready(self.write(|t| {
            if t.overlaps(request.employee_id, request.range.start(), request.range.end()) {
                return Err(StoreError::StaleState);
            }
            t.next_request_id += 1;
            let stored = request.with_id(t.next_request_id);
            t.requests.insert(stored.id, stored.clone());
            Ok(stored)
        }))
    }

    fn commit_decision(
        &self,
        write: DecisionWrite,
    ) -> BoxFuture<'_, StoreResult<AttendanceRequest>> {
        ready(self.write(|t| {
            let current = t
                .requests
                .get(&write.request.id)
                .map(|r| r.status)
                .ok_or(StoreError::StaleState)?;
            if current != write.expected_status {
                return Err(StoreError::StaleState);
            }
            if let Some(deduction) = write.deduction {
                let owner = t
                    .employees
                    .get_mut(&deduction.employee_id)
                    .ok_or(StoreError::StaleState)?;
                if let Some(available) = owner.balances.available(deduction.category) {
                    if available < deduction.days {
                        return Err(StoreError::Exhausted { available });
                    }
                }
                owner.balances.deduct(deduction.category, deduction.days);
            }
            t.requests.insert(write.request.id, write.request.clone());
            Ok(write.request)
        }))
    }

    fn insert_feedback(&self, feedback: NewFeedback) -> BoxFuture<'_, StoreResult<Feedback>> {
        ready(Ok(self.write(|t| {
            t.next_feedback_id += 1;
            let stored = feedback.with_id(t.next_feedback_id);
            t.feedback.insert(stored.id, stored.clone());
            stored
        })))
    }

    fn list_feedback(&self) -> BoxFuture<'_, StoreResult<Vec<Feedback>>> {
        ready(Ok(self.read(|t| t.feedback.values().rev().cloned().collect())))
    }

    fn insert_info_request(
        &self,
        request: NewInfoRequest,
    ) -> BoxFuture<'_, StoreResult<InfoRequest>> {
        ready(Ok(self.write(|t| {
            t.next_info_request_id += 1;
            let stored = request.with_id(t.next_info_request_id);
            t.info_requests.insert(stored.id, stored.clone());
            stored
        })))
    }

    fn list_info_requests(&self) -> BoxFuture<'_, StoreResult<Vec<InfoRequest>>> {
        ready(Ok(self.read(|t| t.info_requests.values().rev().cloned().collect())))
    }

    fn resolve_info_request(&self, id: u64) -> BoxFuture<'_, StoreResult<Option<InfoRequest>>> {
        ready(Ok(self.write(|t| {
            t.info_requests.get_mut(&id).map(|r| {
                r.status = InfoRequestStatus::Resolved;
                r.clone()
            })
        })))
    }
}
