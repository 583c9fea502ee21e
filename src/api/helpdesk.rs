use crate::auth::auth::AuthUser;
use crate::model::helpdesk::{Feedback, InfoRequest};
use crate::service::helpdesk::{
    FeedbackEntry, FeedbackInput, Helpdesk, InfoRequestEntry, InfoRequestInput,
};
use actix_web::{HttpResponse, Responder, web};

/* =========================
Submit (self)
========================= */
#[utoipa::path(
    post,
    path = "/ems/user/feedback",
    request_body = FeedbackInput,
    responses(
        (status = 201, description = "Feedback stored", body = Feedback),
        (status = 400, description = "Feedback is empty"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Helpdesk"
)]
pub async fn submit_feedback(
    auth: AuthUser,
    helpdesk: web::Data<Helpdesk>,
    payload: web::Json<FeedbackInput>,
) -> actix_web::Result<impl Responder> {
    let feedback = helpdesk
        .submit_feedback(auth.employee_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(feedback))
}

#[utoipa::path(
    post,
    path = "/ems/user/info-requests",
    request_body = InfoRequestInput,
    responses(
        (status = 201, description = "Info request stored as SUBMITTED", body = InfoRequest),
        (status = 400, description = "Request type is empty"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Helpdesk"
)]
pub async fn submit_info_request(
    auth: AuthUser,
    helpdesk: web::Data<Helpdesk>,
    payload: web::Json<InfoRequestInput>,
) -> actix_web::Result<impl Responder> {
    let request = helpdesk
        .submit_info_request(auth.employee_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(request))
}

/* =========================
Review (Admin)
========================= */
#[utoipa::path(
    get,
    path = "/ems/admin/feedback",
    responses(
        (status = 200, description = "All feedback, newest first", body = [FeedbackEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Helpdesk"
)]
pub async fn list_feedback(
    auth: AuthUser,
    helpdesk: web::Data<Helpdesk>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(helpdesk.list_feedback().await?))
}

#[utoipa::path(
    get,
    path = "/ems/admin/info-requests",
    responses(
        (status = 200, description = "All info requests, newest first", body = [InfoRequestEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Helpdesk"
)]
pub async fn list_info_requests(
    auth: AuthUser,
    helpdesk: web::Data<Helpdesk>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(helpdesk.list_info_requests().await?))
}

#[utoipa::path(
    put,
    path = "/ems/admin/info-requests/{id}/resolve",
    params(
        ("id" = u64, Path, description = "Info request ID")
    ),
    responses(
        (status = 200, description = "Info request resolved", body = InfoRequest),
        (status = 404, description = "Info request not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Helpdesk"
)]
pub async fn resolve_info_request(
    auth: AuthUser,
    helpdesk: web::Data<Helpdesk>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let resolved = helpdesk.resolve_info_request(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(resolved))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};

    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::repo::{MemoryStore, Store};
    use crate::routes;
    use crate::service::attendance::tests::staff;
    use crate::service::helpdesk::Helpdesk;
    use crate::utils::username_cache::UsernameCache;

    fn config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".into(),
            jwt_secret: "helpdesk-secret".into(),
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

    fn bearer(config: &Config, id: u64, username: &str, role: Role) -> String {
        let token =
            generate_access_token(id, username.into(), role, &config.jwt_secret, 300).unwrap();
        format!("Bearer {token}")
    }

    #[actix_web::test]
    async fn info_request_round_trip_over_http() {
        let config = config();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let jane = store
            .insert_employee(staff("jane", Role::Employee, None))
            .await
            .unwrap();
        let admin = store
            .insert_employee(staff("root", Role::Admin, None))
            .await
            .unwrap();
        let jane_auth = bearer(&config, jane.id, "jane", Role::Employee);
        let admin_auth = bearer(&config, admin.id, "root", Role::Admin);

        let app_config = config.clone();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(Data::new(Helpdesk::new(store, UsernameCache::default())))
                .configure(move |cfg| routes::configure(cfg, app_config)),
        )
        .await;
        let peer = "127.0.0.1:40001".parse().unwrap();

        let req = test::TestRequest::post()
            .uri("/ems/user/info-requests")
            .peer_addr(peer)
            .insert_header(("Authorization", jane_auth.as_str()))
            .set_json(json!({"request_type": "Salary Slip"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["status"], "SUBMITTED");
        let id = created["id"].as_u64().unwrap();

        // only admins see the queue
        let req = test::TestRequest::get()
            .uri("/ems/admin/info-requests")
            .peer_addr(peer)
            .insert_header(("Authorization", jane_auth.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&format!("/ems/admin/info-requests/{id}/resolve"))
            .peer_addr(peer)
            .insert_header(("Authorization", admin_auth.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/ems/admin/info-requests")
            .peer_addr(peer)
            .insert_header(("Authorization", admin_auth.as_str()))
            .to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed[0]["status"], "RESOLVED");
        assert_eq!(listed[0]["username"], "jane");

        let req = test::TestRequest::post()
            .uri("/ems/user/feedback")
            .peer_addr(peer)
            .insert_header(("Authorization", jane_auth.as_str()))
            .set_json(json!({"feedback": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
