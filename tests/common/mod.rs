use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pharma_meta_api::auth::{hash_password, Role};
use pharma_meta_api::config::AppConfig;
use pharma_meta_api::entities::user;
use pharma_meta_api::{db, schema, AppState};

/// Test harness backed by a file SQLite database in a temp directory; audit
/// logs land in the same directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("pharma_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.audit_log_path = dir.path().join("audit.log").display().to_string();
        cfg.denied_log_path = dir.path().join("denied.log").display().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        schema::bootstrap_schema(&pool)
            .await
            .expect("schema bootstrap failed");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = pharma_meta_api::app(state.clone());
        Self {
            router,
            state,
            _dir: dir,
        }
    }

    pub async fn seed_user(&self, login: &str, password: &str, role: Role) {
        user::ActiveModel {
            login: Set(login.to_string()),
            password_hash: Set(hash_password(password).expect("hash")),
            role: Set(role),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed user");
    }

    /// Seeds and logs in a user, returning its bearer token.
    pub async fn login_as(&self, login: &str, role: Role) -> String {
        self.seed_user(login, "pass-1234", role).await;
        let (token, _) = self
            .state
            .auth
            .login(login, "pass-1234")
            .await
            .expect("login failed");
        token
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Raw-body request used by the CSV endpoints.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &str,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }
}
