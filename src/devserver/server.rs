//! Development auth server

use axum::{
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::models::LoginType;
use crate::config::DevServerConfig;
use crate::error::Result;

use super::routes;

/// A user known to the development server
#[derive(Debug, Clone)]
pub struct DevUser {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub login_type: LoginType,
    pub extra_modules: Vec<String>,
}

/// Outstanding refresh token
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub phone: String,
    /// Access token currently paired with this grant
    pub access_jti: String,
    /// Unix seconds after which the grant is refused
    pub expires_at: i64,
}

/// Application state shared across handlers
pub struct AppState {
    pub config: DevServerConfig,
    /// Provisioned users keyed by phone
    pub users: HashMap<String, DevUser>,
    pub refresh_grants: HashMap<String, RefreshGrant>,
    /// Revoked access token IDs with their expiry, kept until the token
    /// would have expired anyway
    pub revoked: HashMap<String, i64>,
}

impl AppState {
    pub fn new(config: DevServerConfig) -> Self {
        Self {
            config,
            users: HashMap::new(),
            refresh_grants: HashMap::new(),
            revoked: HashMap::new(),
        }
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }

    /// Revoke an access token and every refresh grant paired with it
    pub fn revoke(&mut self, jti: &str, exp: i64) {
        self.revoked.insert(jti.to_string(), exp);
        self.refresh_grants.retain(|_, grant| grant.access_jti != jti);
    }

    /// Forget revocations of tokens that have expired and stale refresh grants
    pub fn prune_expired(&mut self, now: i64) {
        let before = self.revoked.len() + self.refresh_grants.len();
        self.revoked.retain(|_, exp| *exp >= now);
        self.refresh_grants.retain(|_, grant| grant.expires_at >= now);
        let pruned = before - self.revoked.len() - self.refresh_grants.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} expired revocations and grants", pruned);
        }
    }
}

pub type SharedState = Arc<RwLock<AppState>>;

/// Run the development auth server on the configured address
pub async fn run_server(config: DevServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Dev auth server listening on {}", addr);

    serve(listener, config).await
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, config: DevServerConfig) -> Result<()> {
    let state = Arc::new(RwLock::new(AppState::new(config)));
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/auth/login", post(routes::login))
        .route("/api/auth/logout", post(routes::logout))
        .route("/api/auth/verify", get(routes::verify))
        .route("/api/auth/permissions", get(routes::permissions))
        .route("/api/auth/refresh", post(routes::refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
