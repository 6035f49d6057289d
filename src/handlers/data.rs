use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::auth::{Screen, SessionContext};
use crate::entities::EntityKind;
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/import", post(import_csv))
        .route("/export/:table", get(export_csv))
}

/// Accepts a raw CSV body; the target table is read from the header row.
async fn import_csv(
    State(state): State<AppState>,
    ctx: SessionContext,
    body: String,
) -> Result<(StatusCode, Json<crate::services::import_export::ImportSummary>), ServiceError> {
    state.auth.authorize(&ctx, Screen::Add)?;
    let summary = state.transfer.import_csv(&body, &ctx.username).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Streams a full table back as a CSV attachment.
async fn export_csv(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(table): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let kind: EntityKind = table
        .parse()
        .map_err(|_| ServiceError::BadRequest(format!("unknown table '{table}'")))?;
    let csv = state.transfer.export_csv(kind, &ctx.username).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}_export.csv\"", kind.table_name()),
            ),
        ],
        csv,
    ))
}
