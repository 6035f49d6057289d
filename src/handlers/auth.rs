use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{RegisterUserInput, Role, SessionContext};
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let (token, ctx) = state.auth.login(&req.login, &req.password).await?;
    Ok(Json(LoginResponse {
        token,
        username: ctx.username,
        role: ctx.role,
    }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(token) = token {
        state.auth.logout(token).await;
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i32,
}

/// Account creation is reserved for administrators.
async fn register(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(input): Json<RegisterUserInput>,
) -> Result<(StatusCode, Json<RegisterResponse>), ServiceError> {
    if ctx.role != Role::Admin {
        return Err(ServiceError::Forbidden(
            "only administrators can register users".to_string(),
        ));
    }
    let id = state.auth.register_user(input, &ctx.username).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}
