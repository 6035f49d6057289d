use axum::{extract::State, routing::get, Json, Router};

use crate::audit::LogKind;
use crate::auth::{Screen, SessionContext};
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(main_log))
        .route("/denied", get(denied_log))
}

async fn main_log(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<Vec<String>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::Logs)?;
    Ok(Json(state.audit.read(LogKind::Main)))
}

async fn denied_log(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<Vec<String>>, ServiceError> {
    state.auth.authorize(&ctx, Screen::Logs)?;
    Ok(Json(state.audit.read(LogKind::Denied)))
}
