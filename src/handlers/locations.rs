use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::auth::{Screen, SessionContext};
use crate::entities::location;
use crate::errors::ServiceError;
use crate::handlers::{contains_ci, opt_contains_ci};
use crate::services::locations::{LocationInput, LocationView};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route("/view", get(list_location_view))
        .route(
            "/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationFilter {
    pub gln: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    pub name_short: Option<String>,
    pub name_full: Option<String>,
    pub owned_by: Option<i32>,
    pub owned_by_name: Option<String>,
}

impl LocationFilter {
    fn matches(&self, row: &location::Model) -> bool {
        self.gln
            .as_deref()
            .map_or(true, |f| opt_contains_ci(row.gln.as_deref(), f))
            && self
                .country
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.country.as_deref(), f))
            && self
                .address
                .as_deref()
                .map_or(true, |f| contains_ci(&row.address, f))
            && self
                .role
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.role.as_deref(), f))
            && self
                .name_short
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.name_short.as_deref(), f))
            && self
                .name_full
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.name_full.as_deref(), f))
            && self.owned_by.map_or(true, |f| row.owned_by == Some(f))
    }

    fn matches_view(&self, row: &LocationView) -> bool {
        self.matches(&row.location)
            && self
                .owned_by_name
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.owned_by_name.as_deref(), f))
    }
}

async fn list_locations(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<LocationFilter>,
) -> Result<Json<Vec<location::Model>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.locations.list_all().await.into_rows();
    Ok(Json(rows.into_iter().filter(|r| filter.matches(r)).collect()))
}

async fn list_location_view(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<LocationFilter>,
) -> Result<Json<Vec<LocationView>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.locations.list_view().await.into_rows();
    Ok(Json(
        rows.into_iter().filter(|r| filter.matches_view(r)).collect(),
    ))
}

async fn get_location(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<Json<location::Model>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    Ok(Json(state.locations.get(id).await?))
}

async fn create_location(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<LocationInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    state.auth.authorize(&ctx, Screen::Add)?;
    let id = state.locations.create(input, &ctx.username).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn update_location(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
    Json(input): Json<LocationInput>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.locations.update(id, input, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_location(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.locations.delete(id, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
