use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::auth::{Screen, SessionContext};
use crate::entities::medicine;
use crate::errors::ServiceError;
use crate::handlers::{contains_ci, opt_contains_ci};
use crate::services::medicines::{MedicineInput, MedicineView};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_medicines).post(create_medicine))
        .route("/view", get(list_medicine_view))
        .route(
            "/:id",
            get(get_medicine).put(update_medicine).delete(delete_medicine),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicineFilter {
    pub name: Option<String>,
    pub gtin: Option<String>,
    pub sku: Option<String>,
    pub market: Option<String>,
    pub batch_number: Option<String>,
    pub dosage_form: Option<String>,
    pub active_ingredient: Option<String>,
    pub package_size: Option<String>,
    pub atc_code: Option<String>,
    /// Prefix match against the ISO date, e.g. `2027` or `2027-03`.
    pub expiration_date: Option<String>,
    pub owned_by: Option<i32>,
    /// Substring match against the owning company's full name; only
    /// meaningful on the joined view.
    pub owned_by_name: Option<String>,
}

impl MedicineFilter {
    fn matches(&self, row: &medicine::Model) -> bool {
        self.name
            .as_deref()
            .map_or(true, |f| contains_ci(&row.name, f))
            && self.gtin.as_deref().map_or(true, |f| contains_ci(&row.gtin, f))
            && self.sku.as_deref().map_or(true, |f| contains_ci(&row.sku, f))
            && self
                .market
                .as_deref()
                .map_or(true, |f| contains_ci(&row.market, f))
            && self
                .batch_number
                .as_deref()
                .map_or(true, |f| contains_ci(&row.batch_number, f))
            && self
                .dosage_form
                .as_deref()
                .map_or(true, |f| contains_ci(&row.dosage_form, f))
            && self
                .active_ingredient
                .as_deref()
                .map_or(true, |f| contains_ci(&row.active_ingredient, f))
            && self
                .package_size
                .as_deref()
                .map_or(true, |f| contains_ci(&row.package_size, f))
            && self
                .atc_code
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.atc_code.as_deref(), f))
            && self
                .expiration_date
                .as_deref()
                .map_or(true, |f| row.expiration_date.to_string().starts_with(f))
            && self.owned_by.map_or(true, |f| row.owned_by == Some(f))
    }

    fn matches_view(&self, row: &MedicineView) -> bool {
        self.matches(&row.medicine)
            && self
                .owned_by_name
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.owned_by_name.as_deref(), f))
    }
}

async fn list_medicines(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<MedicineFilter>,
) -> Result<Json<Vec<medicine::Model>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.medicines.list_all().await.into_rows();
    Ok(Json(rows.into_iter().filter(|r| filter.matches(r)).collect()))
}

async fn list_medicine_view(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<MedicineFilter>,
) -> Result<Json<Vec<MedicineView>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.medicines.list_view().await.into_rows();
    Ok(Json(
        rows.into_iter().filter(|r| filter.matches_view(r)).collect(),
    ))
}

async fn get_medicine(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<Json<medicine::Model>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    Ok(Json(state.medicines.get(id).await?))
}

async fn create_medicine(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<MedicineInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    state.auth.authorize(&ctx, Screen::Add)?;
    let id = state.medicines.create(input, &ctx.username).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn update_medicine(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
    Json(input): Json<MedicineInput>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.medicines.update(id, input, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_medicine(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.medicines.delete(id, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
