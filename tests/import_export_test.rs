mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use pharma_meta_api::auth::Role;

const COMPANIES_CSV: &str = "\
companies_id,gln,name_short,name_full,gcp_compliant,registration_country,address,type
1,4600000000001,Acme,Acme Pharmaceuticals GmbH,true,Germany,\"Hauptstr. 1, Berlin\",manufacturer
2,,Borealis,Borealis Biotech AB,false,Sweden,,distributor
";

#[tokio::test]
async fn import_is_idempotent() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, body) = app
        .request_raw(Method::POST, "/data/import", Some(&token), COMPANIES_CSV)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let summary: serde_json::Value = serde_json::from_str(&body).expect("summary");
    assert_eq!(summary["table"], "companies");
    assert_eq!(summary["imported"], 2);
    assert_eq!(summary["skipped"], 0);

    // Re-importing the same file adds nothing.
    let (status, body) = app
        .request_raw(Method::POST, "/data/import", Some(&token), COMPANIES_CSV)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let summary: serde_json::Value = serde_json::from_str(&body).expect("summary");
    assert_eq!(summary["imported"], 0);
    assert_eq!(summary["skipped"], 2);

    let (_, rows) = app
        .request(Method::GET, "/companies", Some(&token), None)
        .await;
    assert_eq!(rows.as_array().expect("rows").len(), 2);
}

#[tokio::test]
async fn unknown_header_prefix_is_rejected() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let csv = "suppliers_id,name\n1,Acme\n";
    let (status, body) = app
        .request_raw(Method::POST, "/data/import", Some(&token), csv)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cannot determine the target table"));
}

#[tokio::test]
async fn invalid_row_rolls_the_whole_file_back() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let csv = "\
companies_id,name_short,name_full
1,Acme,Acme Pharmaceuticals GmbH
2,,Missing Short Name Ltd
";
    let (status, body) = app
        .request_raw(Method::POST, "/data/import", Some(&token), csv)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("row 2"));

    // The valid first row must not have been kept.
    let (_, rows) = app
        .request(Method::GET, "/companies", Some(&token), None)
        .await;
    assert_eq!(rows.as_array().expect("rows").len(), 0);
}

#[tokio::test]
async fn export_round_trips_through_import() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    app.request_raw(Method::POST, "/data/import", Some(&token), COMPANIES_CSV)
        .await;

    let (status, exported) = app
        .request_raw(Method::GET, "/data/export/companies", Some(&token), "")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(exported.starts_with("companies_id,"));
    assert!(exported.contains("Acme Pharmaceuticals GmbH"));

    // Everything in the export already exists, so importing it changes nothing.
    let (status, body) = app
        .request_raw(Method::POST, "/data/import", Some(&token), &exported)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let summary: serde_json::Value = serde_json::from_str(&body).expect("summary");
    assert_eq!(summary["imported"], 0);
    assert_eq!(summary["skipped"], 2);
}

#[tokio::test]
async fn export_rejects_unknown_tables() {
    let app = TestApp::new().await;
    let token = app.login_as("admin", Role::Admin).await;

    let (status, body) = app
        .request_raw(Method::GET, "/data/export/suppliers", Some(&token), "")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("unknown table"));
}
