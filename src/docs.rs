use crate::api::attendance::StatusUpdate;
use crate::model::attendance::{
    AttendanceRequest, Decision, LeaveCategory, RequestKind, RequestStatus,
};
use crate::model::department::{Department, EmploymentType};
use crate::model::employee::{Employee, LeaveBalances};
use crate::model::helpdesk::{Feedback, InfoRequest, InfoRequestStatus};
use crate::model::role::Role;
use crate::models::{LoginReqDto, LoginResponse};
use crate::service::attendance::{PendingRequest, Submission};
use crate::service::directory::{CreateEmployee, ProfileFields, UpdateEmployee};
use crate::service::helpdesk::{
    FeedbackEntry, FeedbackInput, InfoRequestEntry, InfoRequestInput,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EMS Attendance & Leave API",
        version = "1.0.0",
        description = r#"
## Employee Management System: attendance and leave

Employees submit attendance adjustments and leave requests; managers approve
or reject them. Approved leave draws from per-category balances
(sick, casual, earned). Leave without pay (LWP) is unlimited.

### Request lifecycle
- Submissions are validated, checked for overlapping dates and, for leave,
  for sufficient balance, then stored as **PENDING**.
- A decision moves a request to **APPROVED** or **REJECTED**.
  Approving leave deducts the balance exactly once.

### Security
All endpoints except login require a **JWT Bearer** token.
Manager/Admin roles gate decisions and staff management.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::attendance::submit_request,
        crate::api::attendance::my_requests,
        crate::api::attendance::check_overlap,
        crate::api::attendance::pending_requests,
        crate::api::attendance::decide_request,

        crate::api::employee::list_managers,
        crate::api::employee::create_manager,
        crate::api::employee::update_manager,
        crate::api::employee::delete_manager,
        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::me,
        crate::api::employee::update_profile,

        crate::api::helpdesk::submit_feedback,
        crate::api::helpdesk::submit_info_request,
        crate::api::helpdesk::list_feedback,
        crate::api::helpdesk::list_info_requests,
        crate::api::helpdesk::resolve_info_request
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            AttendanceRequest,
            PendingRequest,
            Submission,
            StatusUpdate,
            RequestKind,
            LeaveCategory,
            RequestStatus,
            Decision,
            Employee,
            LeaveBalances,
            Role,
            Department,
            EmploymentType,
            CreateEmployee,
            UpdateEmployee,
            ProfileFields,
            Feedback,
            FeedbackInput,
            FeedbackEntry,
            InfoRequest,
            InfoRequestStatus,
            InfoRequestInput,
            InfoRequestEntry
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Attendance", description = "Attendance and leave request APIs"),
        (name = "Employee", description = "Employee and manager management APIs"),
        (name = "Helpdesk", description = "Feedback and HR info request APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_lifecycle_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/ems/user/attendance"));
        assert!(doc
            .paths
            .paths
            .contains_key("/ems/manager/attendance/{request_id}/status"));
        assert!(doc
            .paths
            .paths
            .contains_key("/ems/admin/info-requests/{id}/resolve"));
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
