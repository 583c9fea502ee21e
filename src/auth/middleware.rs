use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ServiceError;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use tracing::debug;

/// Resolves the bearer token on `req` into the caller's identity.
fn authenticate(req: &ServiceRequest, secret: &str) -> Result<AuthUser, ServiceError> {
    let unauthorized = |message: &str| ServiceError::Unauthorized(message.to_string());

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header encoding"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Authorization header must start with Bearer"))?;

    let claims = verify_token(token, secret).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        unauthorized("Invalid or expired token")
    })?;

    let role = Role::from_id(claims.role).ok_or_else(|| unauthorized("Invalid role"))?;

    Ok(AuthUser {
        employee_id: claims.employee_id,
        username: claims.sub,
        role,
    })
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(&req, &config.jwt_secret) {
        Ok(auth_user) => {
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        Err(err) => {
            let resp = err.error_response();
            Ok(req.into_response(resp))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test, web};
    use serde_json::Value;

    use super::*;
    use crate::auth::jwt::generate_access_token;

    fn config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".into(),
            jwt_secret: "middleware-secret".into(),
            database_url: None,
            access_token_ttl: 300,
            rate_login_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/ems".into(),
            log_dir: "logs".into(),
            log_level: tracing::Level::INFO,
            allow_redecide_rejected: false,
            bootstrap_admin: None,
        }
    }

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    #[actix_web::test]
    async fn rejections_share_the_error_body_shape() {
        let app = test::init_service(
            App::new().app_data(Data::new(config())).service(
                web::scope("/ems")
                    .wrap(from_fn(auth_middleware))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        for header in [None, Some("Token abc"), Some("Bearer not-a-jwt")] {
            let mut req = test::TestRequest::get().uri("/ems/whoami");
            if let Some(value) = header {
                req = req.insert_header(("Authorization", value));
            }
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "unauthorized");
            assert!(body["message"].is_string());
        }

        let token =
            generate_access_token(4, "jane".into(), Role::Employee, "middleware-secret", 60)
                .unwrap();
        let req = test::TestRequest::get()
            .uri("/ems/whoami")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "jane");
    }
}
