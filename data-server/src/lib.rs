//! Stand-in for the managed marketplace backend.
//!
//! Serves the hosted data API (listings, order items, todos) with per-entity
//! auth rules, the user pool's sign-up and configuration endpoints, and the
//! upload logging endpoint. State lives in memory.

use std::sync::Arc;

use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

pub mod auth;
pub mod config;
pub mod error;
mod handlers;
pub mod model;
pub mod store;
pub mod upload_log;

pub use auth::{Access, AuthMode, Entity};
pub use config::{ServerConfig, Settings};
pub use error::AppError;
pub use model::{Listing, OrderItem, Page, Status, Todo};
pub use store::Store;

use auth::Claim;

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<Store>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            store: Arc::new(Store::default()),
            settings: Arc::new(settings),
        }
    }

    /// Check the request's auth mode and credential, then the entity rule.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        entity: Entity,
        access: Access,
    ) -> Result<AuthMode, AppError> {
        let claim = Claim::from_headers(headers)?;
        let valid = match claim.mode {
            AuthMode::UserPool => self.store.session_profile(&claim.credential).await.is_some(),
            AuthMode::ApiKey => self.settings.api_key.as_deref() == Some(claim.credential.as_str()),
            AuthMode::Iam => {
                self.settings.infra_credential.as_deref() == Some(claim.credential.as_str())
            }
        };
        if !valid {
            return Err(AppError::Unauthenticated(format!(
                "invalid credential for auth mode {}",
                claim.mode
            )));
        }
        if !self.settings.data.allows(entity, access, claim.mode) {
            return Err(AppError::Forbidden {
                mode: claim.mode,
                access,
                entity,
            });
        }
        Ok(claim.mode)
    }
}

pub fn app(settings: Settings) -> Router {
    router(AppState::new(settings))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/listings",
            get(handlers::list_listings).post(handlers::create_listing),
        )
        .route(
            "/listings/{id}",
            get(handlers::get_listing).patch(handlers::update_listing),
        )
        .route(
            "/order-items",
            get(handlers::list_order_items).post(handlers::create_order_item),
        )
        .route(
            "/order-items/{id}",
            get(handlers::get_order_item).patch(handlers::update_order_item),
        )
        .route("/todos", get(handlers::list_todos).post(handlers::create_todo))
        .route("/todos/observe", get(handlers::observe_todos))
        .route("/auth/config", get(handlers::backend_config))
        .route("/auth/users", post(handlers::sign_up))
        .route("/auth/me", get(handlers::current_user))
        .route("/api/upload-log", post(upload_log::log_upload))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}
