//! Chat Widget Backend
//!
//! Hosts the settings of the embeddable chat widget and injects its
//! configuration into every public page served.

mod admin;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod injector;
mod models;
mod store;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use admin::FormNonce;
use auth::{Authorizer, PskAuthorizer};
use config::{Config, StoreBackend, ASSET_MOUNT};
use db::Repository;
use store::{ConfigurationStore, MemoryStore, SqliteStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConfigurationStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub config: Arc<Config>,
    pub nonce: Arc<FormNonce>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Chat Widget Backend");
    tracing::info!("Public pages: {:?}", config.public_dir);
    tracing::info!("Widget assets: {:?}", config.asset_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if the admin key is not configured
    if config.admin_key.is_none() {
        tracing::warn!(
            "No admin key configured (CHAT_WIDGET_ADMIN_KEY). Anyone can edit the settings!"
        );
    }

    let store: Arc<dyn ConfigurationStore> = match config.store {
        StoreBackend::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            let pool = db::init_database(&config.db_path).await?;
            Arc::new(SqliteStore::new(
                Repository::new(pool),
                config.option_name.clone(),
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory settings store; changes are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Create application state
    let state = AppState {
        store,
        authorizer: Arc::new(PskAuthorizer::new(config.admin_key.clone())),
        config: Arc::new(config.clone()),
        nonce: Arc::new(FormNonce::generate()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // Settings page
    let authorizer = state.authorizer.clone();
    let admin_routes = Router::new()
        .route(
            "/settings",
            get(api::settings_page).post(api::submit_settings_form),
        )
        .layer(middleware::from_fn(move |req, next| {
            auth::require_editor(authorizer.clone(), req, next)
        }));

    // Settings API
    let authorizer = state.authorizer.clone();
    let api_routes = Router::new()
        .route("/settings", get(api::get_settings).put(api::put_settings))
        .route("/settings/schema", get(api::get_schema))
        .layer(middleware::from_fn(move |req, next| {
            auth::require_editor(authorizer.clone(), req, next)
        }));

    // Widget configuration for pages not served here
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let widget_routes = Router::new()
        .route("/widget/config.json", get(api::widget_config))
        .layer(cors);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    let assets = ServeDir::new(&state.config.asset_dir);
    let public_pages = ServeDir::new(&state.config.public_dir);

    Router::new()
        .nest(&state.config.admin_prefix, admin_routes)
        .nest("/api", api_routes)
        .merge(widget_routes)
        .merge(health_routes)
        .nest_service(ASSET_MOUNT, assets)
        .fallback_service(public_pages)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            injector::inject_widget,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
