use crate::{
    auth::jwt::generate_access_token,
    config::Config,
    error::ServiceError,
    models::{LoginReqDto, LoginResponse},
    service::directory::EmployeeDirectory,
};
use actix_web::{HttpResponse, web};
use tracing::{error, info, instrument};

/// Exchange username and password for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(directory, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    directory: web::Data<EmployeeDirectory>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ServiceError::validation("Username or password required").into());
    }

    let employee = directory.authenticate(&user.username, &user.password).await?;

    let access_token = generate_access_token(
        employee.id,
        employee.username.clone(),
        employee.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    info!(employee_id = employee.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer".into(),
        expires_in: config.access_token_ttl,
        employee,
    }))
}
