//! Session and role gate.
//!
//! Sessions are in-memory: a successful login registers a random bearer token
//! mapped to a [`SessionContext`], and every request reconstructs its context
//! from that token. There is no expiry; logout simply removes the entry.
//!
//! Passwords are stored as Argon2 PHC strings. The legacy system compared
//! plaintext passwords; that behavior is intentionally not reproduced.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::audit::AuditLog;
use crate::db::DbPool;
use crate::entities::user;
use crate::errors::ServiceError;

pub use crate::entities::user::Role;

const SESSION_TOKEN_LEN: usize = 32;

/// Screens of the dashboard, used as authorization targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    View,
    Add,
    Edit,
    Logs,
}

impl Screen {
    fn description(&self) -> &'static str {
        match self {
            Screen::View => "view data",
            Screen::Add => "add data",
            Screen::Edit => "edit data",
            Screen::Logs => "view logs",
        }
    }
}

/// Allow-list per role: admins reach every screen, analysts everything but
/// the logs, operators only viewing and adding.
pub fn role_allows(role: Role, screen: Screen) -> bool {
    match role {
        Role::Admin => true,
        Role::Analyst => !matches!(screen, Screen::Logs),
        Role::Operator => matches!(screen, Screen::View | Screen::Add),
    }
}

/// Per-request authentication context, built from the bearer token at request
/// entry and discarded at request exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub username: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<DbPool>,
    audit: Arc<AuditLog>,
    sessions: Arc<RwLock<HashMap<String, SessionContext>>>,
}

impl AuthService {
    pub fn new(db: Arc<DbPool>, audit: Arc<AuditLog>) -> Self {
        Self {
            db,
            audit,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Verifies credentials and opens a session.
    ///
    /// Both the success and the failure paths append exactly one audit line
    /// naming the supplied username.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, SessionContext), ServiceError> {
        let account = user::Entity::find()
            .filter(user::Column::Login.eq(username))
            .one(&*self.db)
            .await?;

        let verified = account
            .as_ref()
            .map(|u| verify_password(password, &u.password_hash))
            .unwrap_or(false);

        let Some(account) = account.filter(|_| verified) else {
            self.audit
                .record(&format!("Failed login attempt: {username}"), None, None);
            return Err(ServiceError::Unauthorized(
                "invalid login or password".to_string(),
            ));
        };

        let context = SessionContext {
            username: account.login.clone(),
            role: account.role,
        };
        let token = generate_token();
        self.sessions
            .write()
            .await
            .insert(token.clone(), context.clone());

        self.audit
            .record(&format!("Successful login: {username}"), None, None);
        debug!(username, "session opened");
        Ok((token, context))
    }

    /// Drops the session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) {
        if let Some(ctx) = self.sessions.write().await.remove(token) {
            self.audit
                .record("User logged out", None, Some(&ctx.username));
        }
    }

    pub async fn session(&self, token: &str) -> Option<SessionContext> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Checks the role allow-list; a denial is audited and answered with 403.
    pub fn authorize(&self, ctx: &SessionContext, screen: Screen) -> Result<(), ServiceError> {
        if role_allows(ctx.role, screen) {
            return Ok(());
        }
        self.audit.record(
            &format!("Access denied to {}", screen.description()),
            None,
            Some(&ctx.username),
        );
        Err(ServiceError::Forbidden("access denied".to_string()))
    }

    /// Creates an account with a hashed password. Logins are unique.
    pub async fn register_user(
        &self,
        input: RegisterUserInput,
        acting_username: &str,
    ) -> Result<i32, ServiceError> {
        let mut errors = Vec::new();
        if input.login.is_empty() || input.login.chars().count() > 20 {
            errors.push("Login must be non-empty and at most 20 characters".to_string());
        }
        if input.password.is_empty() {
            errors.push("Password must not be empty".to_string());
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let existing = user::Entity::find()
            .filter(user::Column::Login.eq(input.login.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "user '{}' already exists",
                input.login
            )));
        }

        let model = user::ActiveModel {
            login: Set(input.login.clone()),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(input.email),
            ..Default::default()
        };
        let created = model.insert(&*self.db).await?;

        self.audit.record(
            "Added user",
            Some(&format!("ID: {}, login: {}", created.id, created.login)),
            Some(acting_username),
        );
        Ok(created.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserInput {
    pub login: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, phc_hash: &str) -> bool {
    PasswordHash::new(phc_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[async_trait]
impl FromRequestParts<crate::AppState> for SessionContext {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;
        state
            .auth
            .session(token)
            .await
            .ok_or_else(|| ServiceError::Unauthorized("invalid or expired session".to_string()))
    }
}
