use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod repo;
mod routes;
mod service;
mod utils;

use config::Config;
use db::init_store;

use crate::docs::ApiDoc;
use crate::service::attendance::{AttendanceService, DecisionPolicy};
use crate::service::directory::EmployeeDirectory;
use crate::service::helpdesk::Helpdesk;
use crate::utils::keyed_lock::KeyedLocks;
use crate::utils::username_cache::UsernameCache;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "EMS attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = init_store(config.database_url.as_deref()).await?;

    let usernames = UsernameCache::default();
    // one lock table for every writer of employee rows
    let locks = KeyedLocks::new();
    let directory = Data::new(EmployeeDirectory::new(
        Arc::clone(&store),
        usernames.clone(),
        locks.clone(),
    ));
    let helpdesk = Data::new(Helpdesk::new(Arc::clone(&store), usernames.clone()));
    let attendance = Data::new(AttendanceService::new(
        store,
        usernames,
        locks,
        DecisionPolicy {
            allow_redecide_rejected: config.allow_redecide_rejected,
        },
    ));

    if let Some((username, password)) = &config.bootstrap_admin {
        if let Err(e) = directory.ensure_admin(username, password).await {
            error!(error = %e, "Failed to seed bootstrap admin");
        }
    }

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(directory.clone())
            .app_data(attendance.clone())
            .app_data(helpdesk.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await
    .context("Server terminated with an error")
}
