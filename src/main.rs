use std::sync::{Arc, Mutex};

use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tutorhub::config::AppConfig;
use tutorhub::db;
use tutorhub::handlers;
use tutorhub::services;
use tutorhub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if !config.admin_email.is_empty() && !config.admin_password.is_empty() {
        if services::admin::seed_admin(&conn, &config.admin_email, &config.admin_password)
            .map_err(|e| anyhow::anyhow!("admin seeding failed: {e}"))?
        {
            tracing::info!("seeded admin account {}", config.admin_email);
        }
    }

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/tutors", get(handlers::tutors::list_tutors))
        .route(
            "/api/tutors/profile",
            post(handlers::tutors::create_profile).patch(handlers::tutors::update_profile),
        )
        .route(
            "/api/tutors/dashboard/me",
            get(handlers::tutors::dashboard),
        )
        .route(
            "/api/tutors/availability/me",
            get(handlers::availability::list_my_slots),
        )
        .route(
            "/api/tutors/availability",
            put(handlers::availability::replace_slots).post(handlers::availability::add_slots),
        )
        .route(
            "/api/tutors/availability/:id",
            patch(handlers::availability::update_slot)
                .delete(handlers::availability::delete_slot),
        )
        .route("/api/tutors/:id", get(handlers::tutors::tutor_detail))
        .route(
            "/api/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::my_bookings),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/cancel",
            patch(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/complete",
            patch(handlers::bookings::complete_booking),
        )
        .route("/api/reviews", post(handlers::reviews::create_review))
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route(
            "/api/admin/users/:id",
            patch(handlers::admin::update_user_status),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
