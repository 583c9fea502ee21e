//! Employee directory: account creation with default leave balances,
//! profile updates and deletion.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{ServiceError, ServiceResult};
use crate::model::department::{Department, EmploymentType};
use crate::model::employee::{BalancePatch, Employee, LeaveBalances, NewEmployee};
use crate::model::role::Role;
use crate::repo::{EmployeeUpdate, Store, StoreError};
use crate::utils::keyed_lock::KeyedLocks;
use crate::utils::username_cache::UsernameCache;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "username": "jane.doe",
    "password": "s3cret-pass",
    "reporting_manager_id": 2,
    "mobile_number": "+8801712345678",
    "department": "DEVELOPMENT",
    "employment_type": "FULL_TIME"
}))]
pub struct CreateEmployee {
    pub username: String,
    pub password: String,
    pub reporting_manager_id: Option<u64>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub username: Option<String>,
    /// Blank or absent keeps the current password.
    pub password: Option<String>,
    pub reporting_manager_id: Option<u64>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfileFields {
    pub mobile_number: Option<String>,
    pub age: Option<u32>,
    #[schema(value_type = Option<String>, format = "date")]
    pub joining_date: Option<NaiveDate>,
    pub experience: Option<f64>,
    #[schema(example = "IT")]
    pub department: Option<String>,
    #[schema(example = "FULL_TIME")]
    pub employment_type: Option<String>,
    pub sick_leave_balance: Option<u32>,
    pub casual_leave_balance: Option<u32>,
    pub earned_leave_balance: Option<u32>,
}

impl ProfileFields {
    fn balance_patch(&self) -> BalancePatch {
        BalancePatch {
            sick: self.sick_leave_balance,
            casual: self.casual_leave_balance,
            earned: self.earned_leave_balance,
        }
    }
}

/// Who is editing a profile decides which fields they may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    /// Managers and admins: every field.
    Administrative,
    /// The employee themself: no balances, no reporting line.
    SelfService,
}

fn parse_enum<T: FromStr>(label: &str, value: &str) -> ServiceResult<T> {
    value
        .trim()
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| ServiceError::validation(format!("Unknown {label}: {value}")))
}

fn normalize_username(username: &str) -> ServiceResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ServiceError::validation("Username must not be empty"));
    }
    Ok(username.to_string())
}

fn hash(password: &str) -> ServiceResult<String> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        ServiceError::validation("Password could not be processed")
    })
}

pub struct EmployeeDirectory {
    store: Arc<dyn Store>,
    usernames: UsernameCache,
    locks: KeyedLocks,
}

impl EmployeeDirectory {
    /// `locks` must be the table the attendance service decides under, so
    /// profile edits and approvals of one employee never interleave.
    pub fn new(store: Arc<dyn Store>, usernames: UsernameCache, locks: KeyedLocks) -> Self {
        Self {
            store,
            usernames,
            locks,
        }
    }

    pub async fn get(&self, id: u64) -> ServiceResult<Employee> {
        self.store
            .find_employee(id)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "Employee",
                id,
            })
    }

    pub async fn list_by_role(&self, role: Role) -> ServiceResult<Vec<Employee>> {
        Ok(self.store.list_employees(Some(role)).await?)
    }

    /// Creates an account. Balances not given fall back to the defaults;
    /// a missing reporting manager falls back to `acting_id`.
    #[instrument(name = "directory_create", skip(self, input), fields(username = %input.username))]
    pub async fn create(
        &self,
        input: CreateEmployee,
        role: Role,
        acting_id: Option<u64>,
    ) -> ServiceResult<Employee> {
        let username = normalize_username(&input.username)?;
        if input.password.trim().is_empty() {
            return Err(ServiceError::validation("Password is required"));
        }
        if self.store.find_employee_by_username(&username).await?.is_some() {
            return Err(ServiceError::Conflict("Username already exists".into()));
        }

        let defaults = LeaveBalances::default();
        let profile = input.profile;
        let employee = NewEmployee {
            username,
            password_hash: hash(&input.password)?,
            role,
            reporting_manager_id: input.reporting_manager_id.or(acting_id),
            is_active: true,
            mobile_number: profile.mobile_number,
            age: profile.age,
            joining_date: profile.joining_date,
            experience: profile.experience,
            department: profile
                .department
                .as_deref()
                .map(|d| parse_enum::<Department>("department", d))
                .transpose()?,
            employment_type: profile
                .employment_type
                .as_deref()
                .map(|t| parse_enum::<EmploymentType>("employment type", t))
                .transpose()?,
            balances: LeaveBalances {
                sick: profile.sick_leave_balance.unwrap_or(defaults.sick),
                casual: profile.casual_leave_balance.unwrap_or(defaults.casual),
                earned: profile.earned_leave_balance.unwrap_or(defaults.earned),
            },
        };

        let created = self.store.insert_employee(employee).await.map_err(|e| match e {
            StoreError::Duplicate(_) => ServiceError::Conflict("Username already exists".into()),
            other => other.into(),
        })?;
        info!(employee_id = created.id, role = %created.role, "Employee created");
        Ok(created)
    }

    /// Applies the present fields of `input` to employee `id`. Unknown
    /// department or employment type values are rejected, not skipped.
    #[instrument(name = "directory_update", skip(self, input))]
    pub async fn update(
        &self,
        id: u64,
        input: UpdateEmployee,
        scope: EditScope,
    ) -> ServiceResult<Employee> {
        let profile = input.profile;
        let balances = profile.balance_patch();

        if scope == EditScope::SelfService
            && (!balances.is_empty() || input.reporting_manager_id.is_some())
        {
            return Err(ServiceError::Forbidden(
                "Leave balances and reporting line are managed by your manager".into(),
            ));
        }

        let _guard = self.locks.lock(id).await;
        let mut employee = self.get(id).await?;

        if let Some(username) = input.username.as_deref() {
            let username = normalize_username(username)?;
            if !username.eq_ignore_ascii_case(&employee.username)
                && self.store.find_employee_by_username(&username).await?.is_some()
            {
                return Err(ServiceError::Conflict("Username already taken".into()));
            }
            employee.username = username;
        }
        if let Some(password) = input.password.as_deref().filter(|p| !p.trim().is_empty()) {
            employee.password_hash = hash(password)?;
        }
        if let Some(manager_id) = input.reporting_manager_id {
            employee.reporting_manager_id = Some(manager_id);
        }

        if let Some(mobile) = profile.mobile_number {
            employee.mobile_number = Some(mobile);
        }
        if let Some(age) = profile.age {
            employee.age = Some(age);
        }
        if let Some(joining_date) = profile.joining_date {
            employee.joining_date = Some(joining_date);
        }
        if let Some(experience) = profile.experience {
            employee.experience = Some(experience);
        }
        if let Some(department) = profile.department.as_deref() {
            employee.department = Some(parse_enum("department", department)?);
        }
        if let Some(employment_type) = profile.employment_type.as_deref() {
            employee.employment_type = Some(parse_enum("employment type", employment_type)?);
        }

        let stored = self
            .store
            .update_employee(EmployeeUpdate { employee, balances })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => ServiceError::Conflict("Username already taken".into()),
                other => other.into(),
            })?
            .ok_or(ServiceError::NotFound {
                entity: "Employee",
                id,
            })?;

        self.usernames.forget(id).await;
        info!(employee_id = id, "Employee updated");
        Ok(stored)
    }

    #[instrument(name = "directory_delete", skip(self))]
    pub async fn delete(&self, id: u64) -> ServiceResult<()> {
        let _guard = self.locks.lock(id).await;
        let deleted = self.store.delete_employee(id).await.map_err(|e| match e {
            StoreError::StaleState => ServiceError::Conflict(
                "Employee still has attendance requests and cannot be deleted".into(),
            ),
            other => other.into(),
        })?;
        if !deleted {
            return Err(ServiceError::NotFound {
                entity: "Employee",
                id,
            });
        }
        self.usernames.forget(id).await;
        info!(employee_id = id, "Employee deleted");
        Ok(())
    }

    /// Checks credentials for login. Unknown user, wrong password and
    /// inactive account all read the same to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<Employee> {
        let invalid = || ServiceError::Unauthorized("Invalid credentials".into());

        let employee = self
            .store
            .find_employee_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;
        verify_password(password, &employee.password_hash).map_err(|_| invalid())?;
        if !employee.is_active {
            return Err(invalid());
        }
        Ok(employee)
    }

    /// Seeds an ADMIN account when `username` is not taken yet.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> ServiceResult<()> {
        if self.store.find_employee_by_username(username).await?.is_some() {
            return Ok(());
        }
        let input = CreateEmployee {
            username: username.to_string(),
            password: password.to_string(),
            reporting_manager_id: None,
            profile: ProfileFields::default(),
        };
        self.create(input, Role::Admin, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{
        DateRange, Decision, LeaveCategory, NewAttendanceRequest, RequestKind, RequestStatus,
    };
    use crate::repo::MemoryStore;
    use crate::service::attendance::tests::{date, staff};
    use crate::service::attendance::{AttendanceService, DecisionPolicy, Submission};
    use futures::FutureExt;

    fn directory() -> (Arc<MemoryStore>, EmployeeDirectory) {
        let store = Arc::new(MemoryStore::new());
        let dir =
            EmployeeDirectory::new(store.clone(), UsernameCache::default(), KeyedLocks::new());
        (store, dir)
    }

    fn create_input(username: &str) -> CreateEmployee {
        CreateEmployee {
            username: username.into(),
            password: "pa55word".into(),
            reporting_manager_id: None,
            profile: ProfileFields::default(),
        }
    }

    #[actix_web::test]
    async fn create_applies_default_balances_and_manager() {
        let (_, dir) = directory();
        let created = dir
            .create(create_input("  jane  "), Role::Employee, Some(2))
            .await
            .unwrap();
        assert_eq!(created.username, "jane");
        assert_eq!(created.balances, LeaveBalances::default());
        assert_eq!(created.reporting_manager_id, Some(2));
        assert!(created.is_active);
        assert_ne!(created.password_hash, "pa55word");

        let explicit = CreateEmployee {
            reporting_manager_id: Some(9),
            ..create_input("john")
        };
        let created = dir.create(explicit, Role::Employee, Some(2)).await.unwrap();
        assert_eq!(created.reporting_manager_id, Some(9));
    }

    #[actix_web::test]
    async fn create_rejects_duplicates_and_blank_password() {
        let (_, dir) = directory();
        dir.create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();
        let err = dir
            .create(create_input("jane"), Role::Manager, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let blank = CreateEmployee {
            password: "   ".into(),
            ..create_input("other")
        };
        let err = dir.create(blank, Role::Employee, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn unknown_department_is_a_validation_error() {
        let (_, dir) = directory();
        let jane = dir
            .create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();

        let input = UpdateEmployee {
            profile: ProfileFields {
                department: Some("ASTRONAUTS".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = dir
            .update(jane.id, input, EditScope::Administrative)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let input = UpdateEmployee {
            profile: ProfileFields {
                department: Some("finance".into()),
                employment_type: Some("PART_TIME".into()),
                sick_leave_balance: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = dir
            .update(jane.id, input, EditScope::Administrative)
            .await
            .unwrap();
        assert_eq!(updated.department, Some(Department::Finance));
        assert_eq!(updated.employment_type, Some(EmploymentType::PartTime));
        assert_eq!(updated.balances.sick, 3);
        assert_eq!(updated.balances.casual, 7);
    }

    #[actix_web::test]
    async fn self_service_cannot_touch_balances() {
        let (_, dir) = directory();
        let jane = dir
            .create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();
        let input = UpdateEmployee {
            profile: ProfileFields {
                earned_leave_balance: Some(99),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = dir
            .update(jane.id, input, EditScope::SelfService)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let input = UpdateEmployee {
            password: Some("".into()),
            profile: ProfileFields {
                mobile_number: Some("+1 555 0100".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = dir
            .update(jane.id, input, EditScope::SelfService)
            .await
            .unwrap();
        assert_eq!(updated.mobile_number.as_deref(), Some("+1 555 0100"));
        assert_eq!(updated.password_hash, jane.password_hash);
    }

    #[actix_web::test]
    async fn username_change_must_stay_unique() {
        let (_, dir) = directory();
        dir.create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();
        let john = dir
            .create(create_input("john"), Role::Employee, None)
            .await
            .unwrap();
        let input = UpdateEmployee {
            username: Some("jane".into()),
            ..Default::default()
        };
        let err = dir
            .update(john.id, input, EditScope::Administrative)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[actix_web::test]
    async fn delete_refuses_employees_with_requests() {
        let (store, dir) = directory();
        let jane = store
            .insert_employee(staff("jane", Role::Employee, None))
            .await
            .unwrap();
        let john = store
            .insert_employee(staff("john", Role::Employee, None))
            .await
            .unwrap();
        store
            .insert_request(NewAttendanceRequest {
                employee_id: jane.id,
                reporting_manager_id: None,
                kind: RequestKind::Leave,
                category: Some(LeaveCategory::Sick),
                range: DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).unwrap(),
                employee_comment: None,
            })
            .await
            .unwrap();

        assert!(matches!(
            dir.delete(jane.id).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));
        dir.delete(john.id).await.unwrap();
        assert!(matches!(
            dir.delete(john.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[actix_web::test]
    async fn authenticate_checks_password_and_activity() {
        let (store, dir) = directory();
        let jane = dir
            .create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();
        assert_eq!(dir.authenticate("jane", "pa55word").await.unwrap().id, jane.id);
        assert!(matches!(
            dir.authenticate("jane", "wrong").await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
        assert!(dir.authenticate("nobody", "pa55word").await.is_err());

        let mut inactive = jane.clone();
        inactive.is_active = false;
        store
            .update_employee(EmployeeUpdate {
                employee: inactive,
                balances: BalancePatch::default(),
            })
            .await
            .unwrap();
        assert!(dir.authenticate("jane", "pa55word").await.is_err());
    }

    #[actix_web::test]
    async fn ensure_admin_is_idempotent() {
        let (store, dir) = directory();
        dir.ensure_admin("root", "toor").await.unwrap();
        dir.ensure_admin("root", "other").await.unwrap();
        let admins = store.list_employees(Some(Role::Admin)).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].reporting_manager_id, None);
    }

    fn mobile_edit(number: &str) -> UpdateEmployee {
        UpdateEmployee {
            profile: ProfileFields {
                mobile_number: Some(number.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn profile_edit_waits_for_the_owner_lock() {
        let store = Arc::new(MemoryStore::new());
        let locks = KeyedLocks::new();
        let dir = EmployeeDirectory::new(store.clone(), UsernameCache::default(), locks.clone());
        let jane = dir
            .create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();

        let guard = locks.lock(jane.id).await;
        assert!(dir
            .update(jane.id, mobile_edit("555-0101"), EditScope::SelfService)
            .now_or_never()
            .is_none());
        drop(guard);
        dir.update(jane.id, mobile_edit("555-0101"), EditScope::SelfService)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn profile_edit_racing_approval_keeps_the_deduction() {
        let store = Arc::new(MemoryStore::new());
        let usernames = UsernameCache::default();
        let locks = KeyedLocks::new();
        let dir = EmployeeDirectory::new(store.clone(), usernames.clone(), locks.clone());
        let service =
            AttendanceService::new(store.clone(), usernames, locks, DecisionPolicy::default());

        let jane = dir
            .create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();
        let req = service
            .submit(
                jane.id,
                Submission {
                    kind: RequestKind::Leave,
                    category: Some(LeaveCategory::Sick),
                    start_date: Some(date(2024, 5, 6)),
                    end_date: Some(date(2024, 5, 8)),
                    employee_comment: None,
                },
            )
            .await
            .unwrap();

        let (edited, decided) = futures::join!(
            dir.update(jane.id, mobile_edit("555-0102"), EditScope::SelfService),
            service.decide(req.id, Decision::Approved, None),
        );
        edited.unwrap();
        assert_eq!(decided.unwrap().status, RequestStatus::Approved);

        let stored = dir.get(jane.id).await.unwrap();
        assert_eq!(stored.balances.sick, 4);
        assert_eq!(stored.mobile_number.as_deref(), Some("555-0102"));
    }

    #[actix_web::test]
    async fn admin_balance_override_leaves_other_counters() {
        let (store, dir) = directory();
        let jane = dir
            .create(create_input("jane"), Role::Employee, None)
            .await
            .unwrap();

        // a deduction lands after the admin loaded the profile
        let mut stored = store.find_employee(jane.id).await.unwrap().unwrap();
        stored.balances.sick = 2;
        store
            .update_employee(EmployeeUpdate {
                employee: stored,
                balances: BalancePatch {
                    sick: Some(2),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        let input = UpdateEmployee {
            profile: ProfileFields {
                earned_leave_balance: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = dir
            .update(jane.id, input, EditScope::Administrative)
            .await
            .unwrap();
        assert_eq!(updated.balances.sick, 2);
        assert_eq!(updated.balances.earned, 20);
    }
}
