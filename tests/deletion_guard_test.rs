mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use pharma_meta_api::auth::Role;
use serde_json::json;

/// Seeds a company, a medicine and a location owned by it, and one operation
/// referencing both. Returns (company, medicine, location, operation) ids.
async fn seed_chain(app: &TestApp, token: &str) -> (i64, i64, i64, i64) {
    let (_, body) = app
        .request(
            Method::POST,
            "/companies",
            Some(token),
            Some(json!({
                "name_short": "Acme",
                "name_full": "Acme Pharmaceuticals GmbH"
            })),
        )
        .await;
    let company = body["id"].as_i64().expect("company id");

    let (_, body) = app
        .request(
            Method::POST,
            "/medicines",
            Some(token),
            Some(json!({
                "name": "Metformin",
                "gtin": "04601234567890",
                "sku": "MET-500",
                "market": "EU",
                "batch_number": "B-2024-001",
                "expiration_date": "2027-03-01",
                "dosage_form": "tablet",
                "active_ingredient": "metformin hydrochloride",
                "package_size": "30",
                "owned_by": company
            })),
        )
        .await;
    let medicine = body["id"].as_i64().expect("medicine id");

    let (_, body) = app
        .request(
            Method::POST,
            "/locations",
            Some(token),
            Some(json!({
                "address": "Hauptstr. 1, Berlin",
                "country": "Germany",
                "name_short": "BER-1",
                "owned_by": company
            })),
        )
        .await;
    let location = body["id"].as_i64().expect("location id");

    let (_, body) = app
        .request(
            Method::POST,
            "/operations",
            Some(token),
            Some(json!({
                "medicine_id": medicine,
                "location_id": location,
                "operation_type": "Supply",
                "operation_date": "2025-06-01T10:00:00",
                "quantity": 100
            })),
        )
        .await;
    let operation = body["id"].as_i64().expect("operation id");

    (company, medicine, location, operation)
}

#[tokio::test]
async fn referenced_rows_cannot_be_deleted() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;
    let (company, medicine, location, _) = seed_chain(&app, &token).await;

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/companies/{company}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("still owns medicines or locations"));

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/medicines/{medicine}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/locations/{location}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn deletion_succeeds_bottom_up() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;
    let (company, medicine, location, operation) = seed_chain(&app, &token).await;

    for uri in [
        format!("/operations/{operation}"),
        format!("/medicines/{medicine}"),
        format!("/locations/{location}"),
        format!("/companies/{company}"),
    ] {
        let (status, _) = app.request(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "failed to delete {uri}");
    }

    let (_, rows) = app
        .request(Method::GET, "/companies", Some(&token), None)
        .await;
    assert_eq!(rows.as_array().expect("rows").len(), 0);
}

#[tokio::test]
async fn blocked_deletion_leaves_the_row_in_place() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;
    let (company, _, _, _) = seed_chain(&app, &token).await;

    app.request(
        Method::DELETE,
        &format!("/companies/{company}"),
        Some(&token),
        None,
    )
    .await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/companies/{company}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name_short"], "Acme");
}

#[tokio::test]
async fn view_endpoints_resolve_reference_names() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;
    seed_chain(&app, &token).await;

    let (status, rows) = app
        .request(Method::GET, "/medicines/view", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["owned_by_name"], "Acme Pharmaceuticals GmbH");

    let (_, rows) = app
        .request(Method::GET, "/operations/view", Some(&token), None)
        .await;
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows[0]["medicine_name"], "Metformin");
    assert_eq!(rows[0]["location_name"], "BER-1");
}
