use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::ServiceError;
use crate::model::role::Role;

/// The authenticated caller, placed in request extensions by
/// `auth_middleware`. Handlers pass `employee_id` into the services
/// explicitly.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub employee_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ServiceError::Unauthorized("Missing token".into())),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_manager_or_admin(&self) -> Result<(), ServiceError> {
        if self.role.is_approver() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Manager/Admin only".into()))
        }
    }
}
