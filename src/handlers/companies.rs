use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::auth::{Screen, SessionContext};
use crate::entities::company;
use crate::errors::ServiceError;
use crate::handlers::{contains_ci, opt_contains_ci};
use crate::services::companies::CompanyInput;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_companies).post(create_company))
        .route(
            "/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyFilter {
    pub gln: Option<String>,
    pub name_short: Option<String>,
    pub name_full: Option<String>,
    pub gcp_compliant: Option<bool>,
    pub registration_country: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub company_type: Option<String>,
}

impl CompanyFilter {
    fn matches(&self, row: &company::Model) -> bool {
        self.gln
            .as_deref()
            .map_or(true, |f| opt_contains_ci(row.gln.as_deref(), f))
            && self
                .name_short
                .as_deref()
                .map_or(true, |f| contains_ci(&row.name_short, f))
            && self
                .name_full
                .as_deref()
                .map_or(true, |f| contains_ci(&row.name_full, f))
            && self.gcp_compliant.map_or(true, |f| row.gcp_compliant == f)
            && self.registration_country.as_deref().map_or(true, |f| {
                opt_contains_ci(row.registration_country.as_deref(), f)
            })
            && self
                .address
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.address.as_deref(), f))
            && self
                .company_type
                .as_deref()
                .map_or(true, |f| opt_contains_ci(row.company_type.as_deref(), f))
    }
}

async fn list_companies(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(filter): Query<CompanyFilter>,
) -> Result<Json<Vec<company::Model>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    let rows = state.companies.list_all().await.into_rows();
    Ok(Json(rows.into_iter().filter(|r| filter.matches(r)).collect()))
}

async fn get_company(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<Json<company::Model>, ServiceError> {
    state.auth.authorize(&ctx, Screen::View)?;
    Ok(Json(state.companies.get(id).await?))
}

async fn create_company(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<CompanyInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    state.auth.authorize(&ctx, Screen::Add)?;
    let id = state.companies.create(input, &ctx.username).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn update_company(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
    Json(input): Json<CompanyInput>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.companies.update(id, input, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_company(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.auth.authorize(&ctx, Screen::Edit)?;
    state.companies.delete(id, &ctx.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> company::Model {
        company::Model {
            id: 1,
            gln: Some("4600000000001".to_string()),
            name_short: "Acme".to_string(),
            name_full: "Acme Pharmaceuticals GmbH".to_string(),
            gcp_compliant: true,
            registration_country: Some("Germany".to_string()),
            address: Some("Hauptstr. 1, Berlin".to_string()),
            company_type: Some("manufacturer".to_string()),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(CompanyFilter::default().matches(&sample()));
    }

    #[test]
    fn filters_combine_with_and() {
        let filter = CompanyFilter {
            name_full: Some("pharma".to_string()),
            gcp_compliant: Some(true),
            ..Default::default()
        };
        assert!(filter.matches(&sample()));

        let filter = CompanyFilter {
            name_full: Some("pharma".to_string()),
            gcp_compliant: Some(false),
            ..Default::default()
        };
        assert!(!filter.matches(&sample()));
    }

    #[test]
    fn missing_optional_field_never_matches_a_filter() {
        let mut row = sample();
        row.gln = None;
        let filter = CompanyFilter {
            gln: Some("460".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&row));
    }
}
