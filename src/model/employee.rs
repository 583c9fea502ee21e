use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::department::{Department, EmploymentType};
use crate::model::role::Role;

pub const DEFAULT_SICK_LEAVE: u32 = 7;
pub const DEFAULT_CASUAL_LEAVE: u32 = 7;
pub const DEFAULT_EARNED_LEAVE: u32 = 15;

/// Remaining leave days per balance-bearing category.
///
/// Counters are unsigned, so a balance can never be observed below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalances {
    #[schema(example = 7)]
    pub sick: u32,
    #[schema(example = 7)]
    pub casual: u32,
    #[schema(example = 15)]
    pub earned: u32,
}

impl Default for LeaveBalances {
    fn default() -> Self {
        Self {
            sick: DEFAULT_SICK_LEAVE,
            casual: DEFAULT_CASUAL_LEAVE,
            earned: DEFAULT_EARNED_LEAVE,
        }
    }
}

/// Explicit balance overrides from an administrative edit. Counters left
/// `None` keep whatever the store currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalancePatch {
    pub sick: Option<u32>,
    pub casual: Option<u32>,
    pub earned: Option<u32>,
}

impl BalancePatch {
    pub fn is_empty(&self) -> bool {
        self.sick.is_none() && self.casual.is_none() && self.earned.is_none()
    }

    pub fn apply(&self, balances: &mut LeaveBalances) {
        if let Some(sick) = self.sick {
            balances.sick = sick;
        }
        if let Some(casual) = self.casual {
            balances.casual = casual;
        }
        if let Some(earned) = self.earned {
            balances.earned = earned;
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 3,
        "username": "jane.doe",
        "role": "EMPLOYEE",
        "reporting_manager_id": 2,
        "is_active": true,
        "mobile_number": "+8801712345678",
        "age": 29,
        "joining_date": "2024-01-01",
        "experience": 4.5,
        "department": "DEVELOPMENT",
        "employment_type": "FULL_TIME",
        "balances": { "sick": 7, "casual": 7, "earned": 15 }
    })
)]
pub struct Employee {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub reporting_manager_id: Option<u64>,
    pub is_active: bool,
    pub mobile_number: Option<String>,
    pub age: Option<u32>,
    #[schema(value_type = Option<String>, format = "date")]
    pub joining_date: Option<NaiveDate>,
    pub experience: Option<f64>,
    pub department: Option<Department>,
    pub employment_type: Option<EmploymentType>,
    pub balances: LeaveBalances,
}

/// An employee record before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub reporting_manager_id: Option<u64>,
    pub is_active: bool,
    pub mobile_number: Option<String>,
    pub age: Option<u32>,
    pub joining_date: Option<NaiveDate>,
    pub experience: Option<f64>,
    pub department: Option<Department>,
    pub employment_type: Option<EmploymentType>,
    pub balances: LeaveBalances,
}

impl NewEmployee {
    pub fn with_id(self, id: u64) -> Employee {
        Employee {
            id,
            username: self.username,
            password_hash: self.password_hash,
            role: self.role,
            reporting_manager_id: self.reporting_manager_id,
            is_active: self.is_active,
            mobile_number: self.mobile_number,
            age: self.age,
            joining_date: self.joining_date,
            experience: self.experience,
            department: self.department,
            employment_type: self.employment_type,
            balances: self.balances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_overrides_only_named_counters() {
        let mut balances = LeaveBalances {
            sick: 4,
            casual: 7,
            earned: 15,
        };
        BalancePatch::default().apply(&mut balances);
        assert_eq!(balances.sick, 4);

        let patch = BalancePatch {
            earned: Some(20),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut balances);
        assert_eq!(
            balances,
            LeaveBalances {
                sick: 4,
                casual: 7,
                earned: 20
            }
        );
    }
}
