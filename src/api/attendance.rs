use crate::auth::auth::AuthUser;
use crate::error::ServiceError;
use crate::model::attendance::{AttendanceRequest, Decision};
use crate::service::attendance::{AttendanceService, ManagerScope, PendingRequest, Submission};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct OverlapQuery {
    /// First day, inclusive
    #[param(example = "2024-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    /// Last day, inclusive
    #[param(example = "2024-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct PendingQuery {
    /// Only requests whose reporting manager is the caller
    pub mine: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusUpdate {
    #[schema(example = "APPROVED")]
    pub status: String,
    #[schema(example = "Enjoy your time off")]
    pub comment: Option<String>,
}

/* =========================
Submit a request (self)
========================= */
#[utoipa::path(
    post,
    path = "/ems/user/attendance",
    request_body = Submission,
    responses(
        (status = 201, description = "Request stored as PENDING", body = AttendanceRequest),
        (status = 400, description = "Missing dates, start after end, or missing leave category"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Dates overlap an existing request"),
        (status = 422, description = "Insufficient leave balance"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn submit_request(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<Submission>,
) -> actix_web::Result<impl Responder> {
    let request = service
        .submit(auth.employee_id, payload.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/// Caller's own requests, newest first
#[utoipa::path(
    get,
    path = "/ems/user/attendance",
    responses(
        (status = 200, description = "Request history", body = [AttendanceRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_requests(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    let requests = service.history(auth.employee_id).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Whether the caller already has a non-rejected request touching these dates
#[utoipa::path(
    get,
    path = "/ems/user/attendance/check",
    params(OverlapQuery),
    responses(
        (status = 200, description = "true when the dates are already taken", body = bool),
        (status = 400, description = "Start after end"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_overlap(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<OverlapQuery>,
) -> actix_web::Result<impl Responder> {
    let taken = service
        .has_overlap(auth.employee_id, query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(taken))
}

/* =========================
Pending queue (Manager/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/ems/manager/attendance/pending",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending requests, newest first", body = [PendingRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn pending_requests(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<PendingQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let scope = if query.mine.unwrap_or(false) {
        ManagerScope::ReportsTo(auth.employee_id)
    } else {
        ManagerScope::All
    };

    let pending = service.list_pending(scope).await?;
    Ok(HttpResponse::Ok().json(pending))
}

/* =========================
Approve / reject (Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/ems/manager/attendance/{request_id}/status",
    params(
        ("request_id" = u64, Path, description = "ID of the request to decide")
    ),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Decision recorded", body = AttendanceRequest),
        (status = 400, description = "Status must be APPROVED or REJECTED"),
        (status = 404, description = "Request or its employee not found"),
        (status = 409, description = "Request already decided"),
        (status = 422, description = "Insufficient leave balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn decide_request(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    payload: web::Json<StatusUpdate>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let request_id = path.into_inner();
    let StatusUpdate { status, comment } = payload.into_inner();
    let decision: Decision = status.trim().parse().map_err(|_| {
        ServiceError::validation(format!("Status must be APPROVED or REJECTED, got {status:?}"))
    })?;

    tracing::info!(request_id, manager_id = auth.employee_id, %decision, "Decision received");

    let updated = service.decide(request_id, decision, comment).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};

    use crate::config::Config;
    use crate::model::role::Role;
    use crate::repo::{MemoryStore, Store};
    use crate::routes;
    use crate::service::attendance::{AttendanceService, DecisionPolicy};
    use crate::service::directory::{CreateEmployee, EmployeeDirectory, ProfileFields};
    use crate::utils::keyed_lock::KeyedLocks;
    use crate::utils::username_cache::UsernameCache;

    fn config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
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

    fn account(username: &str, manager: Option<u64>) -> CreateEmployee {
        CreateEmployee {
            username: username.into(),
            password: "pa55word".into(),
            reporting_manager_id: manager,
            profile: ProfileFields::default(),
        }
    }

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    macro_rules! call_json {
        ($app:expr, $req:expr) => {{
            let resp = test::call_service($app, $req.peer_addr(peer()).to_request()).await;
            let status = resp.status();
            let body: Value = test::read_body_json(resp).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn leave_lifecycle_over_http() {
        let config = config();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let usernames = UsernameCache::default();
        let locks = KeyedLocks::new();
        let directory = EmployeeDirectory::new(store.clone(), usernames.clone(), locks.clone());
        let service =
            AttendanceService::new(store.clone(), usernames, locks, DecisionPolicy::default());

        let boss = directory
            .create(account("boss", None), Role::Manager, None)
            .await
            .unwrap();
        directory
            .create(account("jane", None), Role::Employee, Some(boss.id))
            .await
            .unwrap();

        let app_config = config.clone();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::new(directory))
                .app_data(Data::new(service))
                .configure(move |cfg| routes::configure(cfg, app_config)),
        )
        .await;

        let login = |username: &'static str| {
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"username": username, "password": "pa55word"}))
        };
        let (status, body) = call_json!(&app, login("jane"));
        assert_eq!(status, StatusCode::OK);
        let jane_token = format!("Bearer {}", body["access_token"].as_str().unwrap());
        assert_eq!(body["employee"]["balances"]["sick"], 7);
        assert!(body["employee"].get("password_hash").is_none());

        let (_, body) = call_json!(&app, login("boss"));
        let boss_token = format!("Bearer {}", body["access_token"].as_str().unwrap());

        // no token
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/ems/user/attendance")
                .peer_addr(peer())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let (status, created) = call_json!(
            &app,
            test::TestRequest::post()
                .uri("/ems/user/attendance")
                .insert_header(("Authorization", jane_token.as_str()))
                .set_json(json!({
                    "kind": "LEAVE",
                    "category": "SICK",
                    "start_date": "2024-01-01",
                    "end_date": "2024-01-03"
                }))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "PENDING");
        assert_eq!(created["reporting_manager_id"], boss.id);
        let request_id = created["id"].as_u64().unwrap();

        // employees cannot decide
        let (status, _) = call_json!(
            &app,
            test::TestRequest::put()
                .uri(&format!("/ems/manager/attendance/{request_id}/status"))
                .insert_header(("Authorization", jane_token.as_str()))
                .set_json(json!({"status": "APPROVED"}))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, pending) = call_json!(
            &app,
            test::TestRequest::get()
                .uri("/ems/manager/attendance/pending?mine=true")
                .insert_header(("Authorization", boss_token.as_str()))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending[0]["id"], request_id);
        assert_eq!(pending[0]["username"], "jane");

        let (status, _) = call_json!(
            &app,
            test::TestRequest::put()
                .uri(&format!("/ems/manager/attendance/{request_id}/status"))
                .insert_header(("Authorization", boss_token.as_str()))
                .set_json(json!({"status": "maybe"}))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, decided) = call_json!(
            &app,
            test::TestRequest::put()
                .uri(&format!("/ems/manager/attendance/{request_id}/status"))
                .insert_header(("Authorization", boss_token.as_str()))
                .set_json(json!({"status": "approved", "comment": "ok"}))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decided["status"], "APPROVED");

        let (status, body) = call_json!(
            &app,
            test::TestRequest::put()
                .uri(&format!("/ems/manager/attendance/{request_id}/status"))
                .insert_header(("Authorization", boss_token.as_str()))
                .set_json(json!({"status": "APPROVED"}))
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_transition");

        let (_, me) = call_json!(
            &app,
            test::TestRequest::get()
                .uri("/ems/user/me")
                .insert_header(("Authorization", jane_token.as_str()))
        );
        assert_eq!(me["balances"]["sick"], 4);

        let (status, taken) = call_json!(
            &app,
            test::TestRequest::get()
                .uri("/ems/user/attendance/check?start_date=2024-01-02&end_date=2024-01-04")
                .insert_header(("Authorization", jane_token.as_str()))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(taken, Value::Bool(true));

        let (status, body) = call_json!(
            &app,
            test::TestRequest::post()
                .uri("/ems/user/attendance")
                .insert_header(("Authorization", jane_token.as_str()))
                .set_json(json!({
                    "kind": "LEAVE",
                    "category": "SICK",
                    "start_date": "2024-01-02",
                    "end_date": "2024-01-04"
                }))
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");

        let (status, body) = call_json!(
            &app,
            test::TestRequest::post()
                .uri("/ems/user/attendance")
                .insert_header(("Authorization", jane_token.as_str()))
                .set_json(json!({
                    "kind": "LEAVE",
                    "category": "SICK",
                    "start_date": "2024-03-01",
                    "end_date": "2024-03-05"
                }))
        );
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["available"], 4);

        let (status, history) = call_json!(
            &app,
            test::TestRequest::get()
                .uri("/ems/user/attendance")
                .insert_header(("Authorization", jane_token.as_str()))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
    }
}
