mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use pharma_meta_api::auth::Role;
use serde_json::json;

fn company_body() -> serde_json::Value {
    json!({
        "gln": "4600000000001",
        "name_short": "Acme",
        "name_full": "Acme Pharmaceuticals GmbH",
        "gcp_compliant": true,
        "registration_country": "Germany",
        "address": "Hauptstr. 1, Berlin",
        "type": "manufacturer"
    })
}

fn medicine_body(owner: i64) -> serde_json::Value {
    json!({
        "name": "Metformin",
        "gtin": "04601234567890",
        "sku": "MET-500",
        "market": "EU",
        "batch_number": "B-2024-001",
        "expiration_date": "2027-03-01",
        "dosage_form": "tablet",
        "active_ingredient": "metformin hydrochloride",
        "package_size": "30",
        "owned_by": owner,
        "atc_code": "A10BA02"
    })
}

#[tokio::test]
async fn company_crud_roundtrip() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, body) = app
        .request(Method::POST, "/companies", Some(&token), Some(company_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().expect("id");

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/companies/{id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name_short"], "Acme");
    assert_eq!(body["type"], "manufacturer");

    let mut update = company_body();
    update["address"] = json!("Neue Str. 2, Hamburg");
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/companies/{id}"),
            Some(&token),
            Some(update),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/companies/{id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(body["address"], "Neue Str. 2, Hamburg");

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/companies/{id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/companies/{id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn identical_company_is_rejected() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, _) = app
        .request(Method::POST, "/companies", Some(&token), Some(company_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(Method::POST, "/companies", Some(&token), Some(company_body()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("identical"));

    // A company differing in one field is a different record.
    let mut other = company_body();
    other["name_short"] = json!("Acme2");
    let (status, _) = app
        .request(Method::POST, "/companies", Some(&token), Some(other))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn validation_errors_are_collected() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/medicines",
            Some(&token),
            Some(json!({
                "name": "",
                "gtin": "",
                "sku": "MET-500",
                "market": "EU",
                "batch_number": "B-1",
                "expiration_date": "2027-03-01",
                "dosage_form": "tablet",
                "active_ingredient": "metformin",
                "package_size": "30",
                "owned_by": 1
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().expect("details");
    assert_eq!(details.len(), 2);
    assert_eq!(details[0], "Name must not be empty");
    assert_eq!(details[1], "GTIN must be non-empty and at most 20 characters");
}

#[tokio::test]
async fn medicine_update_rejects_gtin_sku_collision() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (_, body) = app
        .request(Method::POST, "/companies", Some(&token), Some(company_body()))
        .await;
    let owner = body["id"].as_i64().expect("id");

    let (status, first) = app
        .request(
            Method::POST,
            "/medicines",
            Some(&token),
            Some(medicine_body(owner)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = first["id"].as_i64().expect("id");

    let mut second = medicine_body(owner);
    second["sku"] = json!("MET-850");
    second["name"] = json!("Metformin Forte");
    let (status, second_created) = app
        .request(Method::POST, "/medicines", Some(&token), Some(second))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = second_created["id"].as_i64().expect("id");
    assert_ne!(first_id, second_id);

    // Renaming the second medicine onto the first GTIN+SKU pair collides.
    let mut update = medicine_body(owner);
    update["name"] = json!("Metformin Forte");
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/medicines/{second_id}"),
            Some(&token),
            Some(update),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("GTIN and SKU"));
}

#[tokio::test]
async fn updating_a_missing_row_is_a_silent_no_op() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, _) = app
        .request(
            Method::PUT,
            "/companies/9999",
            Some(&token),
            Some(company_body()),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, rows) = app
        .request(Method::GET, "/companies", Some(&token), None)
        .await;
    assert_eq!(rows.as_array().expect("rows").len(), 0);
}

#[tokio::test]
async fn operation_requires_positive_quantity() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/operations",
            Some(&token),
            Some(json!({
                "medicine_id": 1,
                "location_id": 1,
                "operation_type": "Supply",
                "operation_date": "2025-06-01T10:00:00",
                "quantity": 0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("Quantity must be greater than zero"));
}

#[tokio::test]
async fn editing_preserves_creation_metadata() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (_, body) = app
        .request(Method::POST, "/companies", Some(&token), Some(company_body()))
        .await;
    let owner = body["id"].as_i64().expect("company id");

    // The import path is the only way to store a shared medicine.
    let csv = format!(
        "medicines_id,owned_by,name,gtin,sku,market,shared,batch_number,\
         expiration_date,dosage_form,active_ingredient,package_size,atc_code\n\
         1,{owner},Metformin,04601234567890,MET-500,EU,true,B-2024-001,\
         2027-03-01,tablet,metformin hydrochloride,30,A10BA02\n"
    );
    let (status, body) = app
        .request_raw(Method::POST, "/data/import", Some(&token), &csv)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, rows) = app
        .request(Method::GET, "/medicines", Some(&token), None)
        .await;
    let row = &rows.as_array().expect("rows")[0];
    let id = row["id"].as_i64().expect("medicine id");
    assert_eq!(row["shared"], true);
    let med_created = row["created_date"].clone();
    assert!(!med_created.is_null());

    let mut update = medicine_body(owner);
    update["batch_number"] = json!("B-2024-002");
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/medicines/{id}"),
            Some(&token),
            Some(update),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, row) = app
        .request(Method::GET, &format!("/medicines/{id}"), Some(&token), None)
        .await;
    assert_eq!(row["batch_number"], "B-2024-002");
    assert_eq!(row["shared"], true, "edit reset the shared flag");
    assert_eq!(row["created_date"], med_created);

    // Locations and operations keep their creation timestamps across edits too.
    let (_, body) = app
        .request(
            Method::POST,
            "/locations",
            Some(&token),
            Some(json!({ "address": "Hauptstr. 1, Berlin", "owned_by": owner })),
        )
        .await;
    let loc = body["id"].as_i64().expect("location id");
    let (_, before) = app
        .request(Method::GET, &format!("/locations/{loc}"), Some(&token), None)
        .await;
    let loc_created = before["created_date"].clone();
    assert!(!loc_created.is_null());

    app.request(
        Method::PUT,
        &format!("/locations/{loc}"),
        Some(&token),
        Some(json!({ "address": "Neue Str. 2, Hamburg", "owned_by": owner })),
    )
    .await;
    let (_, after) = app
        .request(Method::GET, &format!("/locations/{loc}"), Some(&token), None)
        .await;
    assert_eq!(after["address"], "Neue Str. 2, Hamburg");
    assert_eq!(after["created_date"], loc_created);

    let operation = json!({
        "medicine_id": id,
        "location_id": loc,
        "operation_type": "Supply",
        "operation_date": "2025-06-01T10:00:00",
        "quantity": 100
    });
    let (_, body) = app
        .request(Method::POST, "/operations", Some(&token), Some(operation.clone()))
        .await;
    let op = body["id"].as_i64().expect("operation id");
    let (_, before) = app
        .request(Method::GET, &format!("/operations/{op}"), Some(&token), None)
        .await;
    let op_created = before["created_date"].clone();
    assert!(!op_created.is_null());

    let mut update = operation;
    update["quantity"] = json!(250);
    app.request(
        Method::PUT,
        &format!("/operations/{op}"),
        Some(&token),
        Some(update),
    )
    .await;
    let (_, after) = app
        .request(Method::GET, &format!("/operations/{op}"), Some(&token), None)
        .await;
    assert_eq!(after["quantity"], 250);
    assert_eq!(after["created_date"], op_created);
}

#[tokio::test]
async fn listing_filters_apply_in_memory() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    app.request(Method::POST, "/companies", Some(&token), Some(company_body()))
        .await;
    let mut other = company_body();
    other["name_short"] = json!("Borealis");
    other["name_full"] = json!("Borealis Biotech AB");
    other["gcp_compliant"] = json!(false);
    app.request(Method::POST, "/companies", Some(&token), Some(other))
        .await;

    let (status, rows) = app
        .request(
            Method::GET,
            "/companies?name_full=pharma&gcp_compliant=true",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name_short"], "Acme");
}
