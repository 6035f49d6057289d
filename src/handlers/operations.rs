use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::auth::{Screen, SessionContext};
use crate::entities::operation::{self, OperationType};
use crate::errors::ServiceError;
use crate::handlers::opt_contains_ci;
use crate::services::operations::{OperationInput, OperationView};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_operations).post(create_operation))
        .route("/view", get(list_operation_view))
        .route(
            "/:id",
            get(get_operation)
                .put(update_operation)
                .delete(delete_operation),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct OperationFilter {
    pub medicine_id: Option<i32>,
    pub location_id: Option<i32>,
    pub operation_type: Option<OperationType>,
    /// Prefix match against the ISO timestamp, e.g. `2025-06`.
    pub operation_date: Option<String>,
    pub quantity: Option<i32>,
    pub medicine_name: Option<String>,
    pub location_name: Option<String>,
}

impl OperationFilter {
    fn matches(&self, row: &operation::Model) -> bool {
        self.medicine_id
            .map_or(true, |f| row.medicine_id == Some(f))
            && self.location_id.map_or(true, |f| row.location_id == Some(f))
            && self
                .operation_type
                .map_or(true, |f| row.operation_type == f)
            && self.operation_date.as_deref().map_or(true, |f| {
                row.operation_date
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .starts_with(f)
            })
            && self.quantity.map_or(true, |f| row.quantity == f)
    }

    fn matches_view(&self, row: &OperationView) -> bool {
        self.matches(&row.operation)
            && self
                .medicine_name
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.medicine_name.as_deref(), f))
            && self
                .location_name
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.location_name.as_deref(), f))
    }
}

async fn list_operations(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<OperationFilter>,
) -> Result<Json<Vec<operation::Model>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.operations.list_all().await.into_rows();
    Ok(Json(rows.into_iter().filter(|r| filter.matches(r)).collect()))
}

async fn list_operation_view(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<OperationFilter>,
) -> Result<Json<Vec<OperationView>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.operations.list_view().await.into_rows();
    Ok(Json(
        rows.into_iter().filter(|r| filter.matches_view(r)).collect(),
    ))
}

async fn get_operation(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<Json<operation::Model>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    Ok(Json(state.operations.get(id).await?))
}

async fn create_operation(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<OperationInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    state.auth.authorize(&ctx, Screen::Add)?;
    let id = state.operations.create(input, &ctx.username).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn update_operation(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
    Json(input): Json<OperationInput>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.operations.update(id, input, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_operation(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.operations.delete(id, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
