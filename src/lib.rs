//! Crate root: wires the Repository, Event Fabric, Rate Limiter, Directory
//! Client, and Dispatcher into a single `AppState`, mounts the request API
//! (`/do`), the real-time transport (`/ws`), and the system endpoints
//! (`/health`, `/version`). Grounded on the teacher's `build_rocket` in
//! `src/lib.rs` (`.manage()` per component, `AdHoc::on_liftoff` fairings for
//! background tasks), generalized from the teacher's many REST routes to the
//! spec's single action-dispatcher surface.

pub mod config;
pub mod db;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod rate_limit;
pub mod repo;
pub mod state;
pub mod system;
pub mod time;
pub mod transport;
pub mod validate;

use std::env;
use std::sync::Arc;

use config::ServiceConfig;
use db::Db;
use directory::DirectoryClient;
use dispatcher::Dispatcher;
use events::EventFabric;
use rate_limit::RateLimiter;
use repo::Repository;
use rocket_cors::CorsOptions;
use state::AppState;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "data/chat.db".to_string());
    rocket_with_db(&db_path)
}

pub fn rocket_with_db(db_path: &str) -> rocket::Rocket<rocket::Build> {
    rocket_with_db_and_config(db_path, ServiceConfig::from_env())
}

pub fn rocket_with_db_and_config(db_path: &str, config: ServiceConfig) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, config)
}

fn build_rocket(db_path: &str, config: ServiceConfig) -> rocket::Rocket<rocket::Build> {
    env_logger::try_init().ok();

    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let config = Arc::new(config);
    let db = Arc::new(Db::new(db_path));
    let repo = Arc::new(Repository::new(db));
    let events = Arc::new(EventFabric::new(config.subscriber_queue_size));
    let rate_limiter = Arc::new(RateLimiter::new());
    let directory = Arc::new(DirectoryClient::new(&config));

    let app_state = AppState {
        repo,
        events,
        rate_limiter: rate_limiter.clone(),
        directory,
        config: config.clone(),
    };

    let dispatcher = Dispatcher::new();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let typing_repo = app_state.repo.clone();
    let typing_cleanup = std::time::Duration::from_secs(repo::TYPING_TTL_SECS as u64);
    let mut typing_shutdown = shutdown_rx.clone();

    let cors = CorsOptions::default().to_cors().expect("failed to build CORS fairing");

    rocket::build()
        .manage(app_state)
        .manage(dispatcher)
        .attach(cors)
        .register(
            "/",
            rocket::catchers![
                dispatcher::malformed_request,
                dispatcher::not_found,
                dispatcher::too_many_requests,
            ],
        )
        .mount(
            "/",
            rocket::routes![
                dispatcher::dispatch,
                transport::connect,
                system::health,
                system::version,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Rate Limiter Eviction", {
            let rate_limiter = rate_limiter.clone();
            let config = config.clone();
            move |_rocket| {
                Box::pin(async move {
                    rate_limit::spawn_eviction_task(rate_limiter, &config, shutdown_rx);
                    log::info!("rate limiter eviction task started");
                })
            }
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("Typing Indicator Sweep", move |_rocket| {
            Box::pin(async move {
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep(typing_cleanup) => {
                                if let Ok(n) = typing_repo.typing_evict_stale(repo::TYPING_TTL_SECS)
                                    && n > 0
                                {
                                    log::debug!("typing sweep evicted {n} stale indicators");
                                }
                            }
                            _ = typing_shutdown.changed() => {
                                if *typing_shutdown.borrow() {
                                    log::info!("typing indicator sweep shutting down");
                                    break;
                                }
                            }
                        }
                    }
                });
                log::info!("typing indicator sweep task started");
            })
        }))
        .attach(rocket::fairing::AdHoc::on_shutdown("Background Task Shutdown", move |_rocket| {
            Box::pin(async move {
                shutdown_tx.send(true).ok();
            })
        }))
}
