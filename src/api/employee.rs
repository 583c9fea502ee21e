use crate::{
    auth::auth::AuthUser,
    error::{ServiceError, ServiceResult},
    model::{employee::Employee, role::Role},
    service::directory::{CreateEmployee, EditScope, EmployeeDirectory, UpdateEmployee},
};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

/// Refuses to touch an account outside the endpoint's role.
async fn ensure_role(directory: &EmployeeDirectory, id: u64, role: Role) -> ServiceResult<()> {
    let target = directory.get(id).await?;
    if target.role != role {
        return Err(ServiceError::Forbidden(format!("Account {id} is not a {role}")));
    }
    Ok(())
}

async fn create_with_role(
    auth: &AuthUser,
    directory: &EmployeeDirectory,
    payload: CreateEmployee,
    role: Role,
) -> actix_web::Result<HttpResponse> {
    // reporting line defaults to whoever creates the account
    let created = directory
        .create(payload, role, Some(auth.employee_id))
        .await?;
    Ok(HttpResponse::Created().json(created))
}

/* =========================
Managers (Admin)
========================= */
#[utoipa::path(
    get,
    path = "/ems/admin/managers",
    responses(
        (status = 200, description = "All managers, newest first", body = [Employee]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn list_managers(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(directory.list_by_role(Role::Manager).await?))
}

#[utoipa::path(
    post,
    path = "/ems/admin/managers",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Manager created", body = Employee),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already exists"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn create_manager(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    create_with_role(&auth, &directory, payload.into_inner(), Role::Manager).await
}

#[utoipa::path(
    put,
    path = "/ems/admin/managers/{id}",
    params(
        ("id" = u64, Path, description = "Manager ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Manager updated", body = Employee),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Manager not found"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn update_manager(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();
    ensure_role(&directory, id, Role::Manager).await?;
    let updated = directory
        .update(id, payload.into_inner(), EditScope::Administrative)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/ems/admin/managers/{id}",
    params(
        ("id" = u64, Path, description = "Manager ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Manager not found"),
        (status = 409, description = "Manager still owns requests"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn delete_manager(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();
    ensure_role(&directory, id, Role::Manager).await?;
    directory.delete(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/* =========================
Employees (Manager/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/ems/manager/employees",
    responses(
        (status = 200, description = "All employees, newest first", body = [Employee]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    Ok(HttpResponse::Ok().json(directory.list_by_role(Role::Employee).await?))
}

#[utoipa::path(
    post,
    path = "/ems/manager/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already exists"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    create_with_role(&auth, &directory, payload.into_inner(), Role::Employee).await
}

#[utoipa::path(
    put,
    path = "/ems/manager/employees/{id}",
    params(
        ("id" = u64, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Employee not found"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    let id = path.into_inner();
    ensure_role(&directory, id, Role::Employee).await?;
    let updated = directory
        .update(id, payload.into_inner(), EditScope::Administrative)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/ems/manager/employees/{id}",
    params(
        ("id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee still owns requests"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    let id = path.into_inner();
    ensure_role(&directory, id, Role::Employee).await?;
    directory.delete(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/* =========================
Self service
========================= */
#[utoipa::path(
    get,
    path = "/ems/user/me",
    responses(
        (status = 200, description = "Caller's profile and balances", body = Employee),
        (status = 404, description = "Account no longer exists"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn me(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(directory.get(auth.employee_id).await?))
}

#[utoipa::path(
    put,
    path = "/ems/user/profile",
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Profile updated", body = Employee),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Balances or reporting line in payload"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn update_profile(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    let updated = directory
        .update(auth.employee_id, payload.into_inner(), EditScope::SelfService)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}
