use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand_core::RngCore;
use tracing::{debug, info, warn};

use flock_types::api::{AuthenticateRequest, AuthenticateResponse, CreateUserRequest, MessageResponse};
use flock_types::models::{DEFAULT_AVATAR_URL, Session, User};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sessionId";

/// Inserted into request extensions by [`require_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingSession,
    UnknownSession,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    Authenticated { username: String },
    Unauthenticated(AuthFailure),
}

impl AuthResult {
    pub fn into_result(self) -> Result<SessionUser, ApiError> {
        match self {
            AuthResult::Authenticated { username } => Ok(SessionUser { username }),
            AuthResult::Unauthenticated(AuthFailure::Expired) => Err(ApiError::SessionExpired),
            AuthResult::Unauthenticated(_) => Err(ApiError::Unauthorized),
        }
    }
}

/// Decides whether a looked-up session grants access at `now`.
pub fn check_session(session: Option<Session>, now: DateTime<Utc>) -> AuthResult {
    match session {
        None => AuthResult::Unauthenticated(AuthFailure::UnknownSession),
        Some(s) if s.is_expired_at(now) => AuthResult::Unauthenticated(AuthFailure::Expired),
        Some(s) => AuthResult::Authenticated { username: s.user },
    }
}

/// Resolve the `sessionId` cookie to a user, or reject with 401.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let result = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        None => AuthResult::Unauthenticated(AuthFailure::MissingSession),
        Some(token) => {
            let session = state.db_call(move |db| db.get_session(&token)).await?;
            check_session(session, Utc::now())
        }
    };

    if let AuthResult::Unauthenticated(reason) = &result {
        debug!("Rejected {} {}: {:?}", req.method(), req.uri().path(), reason);
    }

    let user = result.into_result()?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

// -- Passwords and tokens --

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// 32 random bytes from the OS, base64url encoded.
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand_core::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(secure)
        .build()
}

/// Persists a new session for `username` and returns the cookie carrying it.
async fn issue_session(state: &AppState, username: &str) -> Result<Cookie<'static>, ApiError> {
    let token = new_session_token();
    let expiry = Utc::now() + state.session_ttl;
    let (id, user) = (token.clone(), username.to_string());
    state
        .db_call(move |db| db.create_session(&id, &user, expiry))
        .await?;

    debug!("Session issued for '{}' (expires {})", username, expiry);
    Ok(session_cookie(token, state.secure_cookies))
}

// -- Handlers --

pub async fn create_user(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();
    let user = User {
        username: req.username.trim().to_string(),
        email: req.email.trim().to_string(),
        name: req.name.trim().to_string(),
        birth_year: req.birth_year,
        birth_month: req.birth_month,
        birth_day: req.birth_day,
        bio: req.bio,
        location: req.location,
        website: req.website,
        avatar: DEFAULT_AVATAR_URL.to_string(),
        cover_image: None,
        is_verified: false,
        created_at: now,
        updated_at: now,
    };

    let record = user.clone();
    state
        .db_call(move |db| db.create_user(&record, &password_hash))
        .await?;
    info!("User '{}' signed up", user.username);

    let cookie = issue_session(&state, &user.username).await?;
    Ok((StatusCode::CREATED, jar.add(cookie), Json(user)))
}

pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<AuthenticateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let lookup = username.clone();
    let row = state.db_call(move |db| db.get_user_row(&lookup)).await?;

    let Some(row) = row else {
        warn!("Login failed: unknown user '{}'", username);
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(&req.password, &row.password)? {
        warn!("Login failed: bad password for '{}'", username);
        return Err(ApiError::InvalidCredentials);
    }

    let cookie = issue_session(&state, &username).await?;
    info!("User '{}' logged in", username);

    Ok((
        jar.add(cookie),
        Json(AuthenticateResponse {
            success: true,
            message: "Authentication successful".into(),
            username,
        }),
    ))
}

/// Clears the client cookie. The stored session is left to expire.
/// The removal cookie carries the same attributes as the one issued, or
/// browsers keep the cross-site original.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(session_cookie(String::new(), state.secure_cookies)),
        Json(MessageResponse::new("Logged out")),
    )
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<User>, ApiError> {
    let username = user.username.clone();
    state
        .db_call(move |db| db.get_user(&username))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}
