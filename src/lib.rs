//! Reference-data backend for a pharmaceutical supply chain: companies,
//! medicines, locations and the operations journal, with audit logging,
//! role-gated access and CSV bulk transfer.

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod schema;
pub mod services;
pub mod validation;

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::audit::AuditLog;
use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::companies::CompanyService;
use crate::services::import_export::ImportExportService;
use crate::services::locations::LocationService;
use crate::services::medicines::MedicineService;
use crate::services::operations::OperationService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub audit: Arc<AuditLog>,
    pub auth: Arc<AuthService>,
    pub companies: CompanyService,
    pub medicines: MedicineService,
    pub locations: LocationService,
    pub operations: OperationService,
    pub transfer: ImportExportService,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig) -> Self {
        let audit = Arc::new(AuditLog::new(
            &config.audit_log_path,
            &config.denied_log_path,
        ));
        Self {
            auth: Arc::new(AuthService::new(db.clone(), audit.clone())),
            companies: CompanyService::new(db.clone(), audit.clone()),
            medicines: MedicineService::new(db.clone(), audit.clone()),
            locations: LocationService::new(db.clone(), audit.clone()),
            operations: OperationService::new(db.clone(), audit.clone()),
            transfer: ImportExportService::new(db.clone(), audit.clone()),
            db,
            config,
            audit,
        }
    }
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", handlers::auth::routes())
        .nest("/companies", handlers::companies::routes())
        .nest("/medicines", handlers::medicines::routes())
        .nest("/locations", handlers::locations::routes())
        .nest("/operations", handlers::operations::routes())
        .nest("/data", handlers::data::routes())
        .nest("/logs", handlers::logs::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = db::check_connection(&state.db).await.is_ok();
    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
