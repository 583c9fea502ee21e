use crate::{
    api::{attendance, employee, helpdesk},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // only None for a zero period or burst, both clamped above
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = build_limiter(config.rate_login_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/admin")
                    // /admin/managers
                    .service(
                        web::resource("/managers")
                            .route(web::get().to(employee::list_managers))
                            .route(web::post().to(employee::create_manager)),
                    )
                    // /admin/managers/{id}
                    .service(
                        web::resource("/managers/{id}")
                            .route(web::put().to(employee::update_manager))
                            .route(web::delete().to(employee::delete_manager)),
                    )
                    // /admin/feedback
                    .service(
                        web::resource("/feedback").route(web::get().to(helpdesk::list_feedback)),
                    )
                    // /admin/info-requests
                    .service(
                        web::resource("/info-requests")
                            .route(web::get().to(helpdesk::list_info_requests)),
                    )
                    // /admin/info-requests/{id}/resolve
                    .service(
                        web::resource("/info-requests/{id}/resolve")
                            .route(web::put().to(helpdesk::resolve_info_request)),
                    ),
            )
            .service(
                web::scope("/manager")
                    // /manager/employees
                    .service(
                        web::resource("/employees")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /manager/employees/{id}
                    .service(
                        web::resource("/employees/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /manager/attendance/pending
                    .service(
                        web::resource("/attendance/pending")
                            .route(web::get().to(attendance::pending_requests)),
                    )
                    // /manager/attendance/{id}/status
                    .service(
                        web::resource("/attendance/{id}/status")
                            .route(web::put().to(attendance::decide_request)),
                    ),
            )
            .service(
                web::scope("/user")
                    .service(web::resource("/me").route(web::get().to(employee::me)))
                    .service(
                        web::resource("/profile").route(web::put().to(employee::update_profile)),
                    )
                    // /user/attendance
                    .service(
                        web::resource("/attendance")
                            .route(web::get().to(attendance::my_requests))
                            .route(web::post().to(attendance::submit_request)),
                    )
                    // /user/attendance/check
                    .service(
                        web::resource("/attendance/check")
                            .route(web::get().to(attendance::check_overlap)),
                    )
                    .service(
                        web::resource("/feedback").route(web::post().to(helpdesk::submit_feedback)),
                    )
                    .service(
                        web::resource("/info-requests")
                            .route(web::post().to(helpdesk::submit_info_request)),
                    ),
            ),
    );
}
