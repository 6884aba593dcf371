//! services/api/src/web/auth.rs
//!
//! Account endpoints: signup, login, logout. Sessions are rows in the
//! database referenced by an `HttpOnly` cookie; passwords are stored as
//! argon2 hashes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use quran_tracker_core::domain::UserProgress;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_cookie;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    /// The server's progress record, for seeding the client cache.
    pub streak: u32,
    pub read_ayahs: Vec<String>,
}

impl AuthResponse {
    fn new(user_id: Uuid, progress: &UserProgress) -> Self {
        Self {
            user_id,
            username: progress.username.clone(),
            email: progress.email.clone(),
            streak: progress.streak,
            read_ayahs: progress.read_ayahs.iter().map(|k| k.to_string()).collect(),
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

const SESSION_DAYS: i64 = 30;

type AuthError = (StatusCode, String);

fn server_error(public: &str) -> AuthError {
    (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
}

fn bad_credentials() -> AuthError {
    (
        StatusCode::UNAUTHORIZED,
        "Invalid email or password".to_string(),
    )
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {:?}", e);
            server_error("Failed to create account")
        })
}

fn password_matches(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash is unparsable: {:?}", e);
        server_error("Authentication error")
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Opens a fresh session row for the user and returns the Set-Cookie value.
async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, AuthError> {
    let session_id = Uuid::new_v4().to_string();
    let lifetime = Duration::days(SESSION_DAYS);

    state
        .db
        .create_auth_session(&session_id, user_id, Utc::now() + lifetime)
        .await
        .map_err(|e| {
            error!("Could not create auth session: {:?}", e);
            server_error("Failed to create session")
        })?;

    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        lifetime.num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Creates an account, seeds an empty progress record, and opens a session.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if req.password.len() < 6 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters.".to_string(),
        ));
    }
    let username = if req.username.trim().is_empty() {
        // Same fallback the web client used: the mailbox part of the email.
        req.email.split('@').next().unwrap_or_default().to_string()
    } else {
        req.username.trim().to_string()
    };

    let password_hash = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(&username, &req.email, &password_hash)
        .await
        .map_err(|e| {
            error!("Account creation failed: {:?}", e);
            server_error("Failed to create account")
        })?;

    // Write-through of a fresh record, nothing read yet.
    let progress = UserProgress::new(&user.username, &user.email);
    state
        .db
        .put_progress(user.user_id, &progress)
        .await
        .map_err(|e| {
            error!("Could not seed progress record: {:?}", e);
            server_error("Failed to create account")
        })?;

    let cookie = open_session(&state, user.user_id).await?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::new(user.user_id, &progress)),
    ))
}

/// Verifies credentials and responds with the stored progress record so the
/// client can seed its cache.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let creds = state.db.get_user_by_email(&req.email).await.map_err(|e| {
        error!("Login lookup failed: {:?}", e);
        bad_credentials()
    })?;

    if !password_matches(&req.password, &creds.hashed_password)? {
        return Err(bad_credentials());
    }

    let progress = state
        .db
        .get_progress(creds.user_id)
        .await
        .map_err(|e| {
            error!("Could not load progress at login: {:?}", e);
            server_error("Failed to load progress")
        })?
        .unwrap_or_else(|| UserProgress::new(&creds.username, &creds.email));

    let cookie = open_session(&state, creds.user_id).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::new(creds.user_id, &progress)),
    ))
}

/// Deletes the session row and expires the cookie.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let session_id = session_cookie(&headers).ok_or((
        StatusCode::UNAUTHORIZED,
        "No session found".to_string(),
    ))?;

    state.db.delete_auth_session(session_id).await.map_err(|e| {
        error!("Could not delete auth session: {:?}", e);
        server_error("Failed to logout")
    })?;

    let expired = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, expired.to_string())]))
}
