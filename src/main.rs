//! CrewSync Backend
//!
//! REST backend for teams, rosters and invitations, stored as path-addressed
//! documents in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting CrewSync Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CREWSYNC_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    if config.rebuild_index_on_start {
        tracing::info!("Rebuilding received-invitations index...");
        let entries = repo.rebuild_invitee_index().await?;
        tracing::info!("Received-invitations index rebuilt with {} entries", entries);
    }

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // User directory
        .route("/users", post(api::create_user))
        .route("/users/{id}", get(api::get_user))
        .route("/users/code/{code}", get(api::lookup_user_by_code))
        .route("/me", get(api::get_me).put(api::update_me))
        .route("/me/roles", post(api::assign_my_role))
        // Team registry
        .route("/teams", get(api::list_owned_teams).post(api::create_team))
        .route("/teams/joined", get(api::list_my_teams))
        .route(
            "/teams/{id}",
            get(api::get_team)
                .put(api::update_team)
                .delete(api::delete_team),
        )
        // Roster
        .route("/roster", get(api::list_members).post(api::add_member))
        .route("/roster/{id}", delete(api::remove_member))
        // Invitations
        .route("/invitations", post(api::create_invitation))
        .route("/invitations/sent", get(api::list_sent_invitations))
        .route(
            "/invitations/sent/{id}",
            get(api::get_sent_invitation).delete(api::cancel_invitation),
        )
        .route("/invitations/received", get(api::list_received_invitations))
        .route(
            "/invitations/received/{inviter_id}/{id}/accept",
            post(api::accept_invitation),
        )
        .route(
            "/invitations/received/{inviter_id}/{id}/reject",
            post(api::reject_invitation),
        )
        // Roles
        .route("/roles/{kind}", get(api::list_roles).post(api::create_role))
        .route("/roles/{kind}/{id}", delete(api::delete_role))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
