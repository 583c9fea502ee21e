//! Per-employee leave balances: sufficiency checks and deductions.
//!
//! Checking and mutating are separate steps. The lifecycle engine checks
//! at submission, then checks again and deducts inside the decision's unit
//! of work; `deduct` never re-validates on its own.

use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::LeaveCategory;
use crate::model::employee::LeaveBalances;

impl LeaveCategory {
    /// LWP is unlimited and never touches a counter.
    pub fn draws_balance(self) -> bool {
        !matches!(self, LeaveCategory::Lwp)
    }
}

impl LeaveBalances {
    /// Days left in `category`, or `None` for LWP.
    pub fn available(&self, category: LeaveCategory) -> Option<u32> {
        match category {
            LeaveCategory::Sick => Some(self.sick),
            LeaveCategory::Casual => Some(self.casual),
            LeaveCategory::Earned => Some(self.earned),
            LeaveCategory::Lwp => None,
        }
    }

    fn counter_mut(&mut self, category: LeaveCategory) -> Option<&mut u32> {
        match category {
            LeaveCategory::Sick => Some(&mut self.sick),
            LeaveCategory::Casual => Some(&mut self.casual),
            LeaveCategory::Earned => Some(&mut self.earned),
            LeaveCategory::Lwp => None,
        }
    }

    pub fn check_sufficient(&self, category: LeaveCategory, days: u32) -> ServiceResult<()> {
        match self.available(category) {
            Some(available) if available < days => Err(ServiceError::InsufficientBalance {
                category,
                available,
                requested: days,
            }),
            _ => Ok(()),
        }
    }

    /// Caller must have run [`LeaveBalances::check_sufficient`] first.
    /// Saturates at zero rather than wrapping.
    pub fn deduct(&mut self, category: LeaveCategory, days: u32) {
        if let Some(counter) = self.counter_mut(category) {
            *counter = counter.saturating_sub(days);
        }
    }
}
