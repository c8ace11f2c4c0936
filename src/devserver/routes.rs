//! Development auth server route handlers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::server::{AppState, DevUser, RefreshGrant, SharedState};
use super::tokens::{create_token, validate_token, Claims};
use crate::auth::models::LoginType;
use crate::auth::wire::{
    ErrorBody, LoginBody, LoginPayload, LoginUserPayload, PermissionsPayload,
    PermissionsUserPayload, RefreshBody, RefreshPayload, RolePayload,
};

type ApiError = (StatusCode, Json<ErrorBody>);

fn reject(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// The role a login type grants, with its default modules
pub fn role_for(login_type: LoginType) -> RolePayload {
    let (name, modules): (&str, &[&str]) = match login_type {
        LoginType::Brand => ("Brand", &["dashboard", "projects", "talent-search"]),
        LoginType::Mcn => ("MCN Agency", &["dashboard", "projects", "talents", "analytics"]),
        LoginType::Talent => ("Talent", &["dashboard", "tasks", "earnings"]),
    };
    RolePayload {
        role_id: login_type.to_string(),
        name: name.to_string(),
        modules: modules.iter().map(|m| m.to_string()).collect(),
    }
}

fn modules_for(user: &DevUser) -> Vec<String> {
    let mut modules = role_for(user.login_type).modules;
    for extra in &user.extra_modules {
        if !modules.contains(extra) {
            modules.push(extra.clone());
        }
    }
    modules
}

fn provision_user(state: &mut AppState, phone: &str, login_type: LoginType) -> DevUser {
    if let Some(user) = state.users.get_mut(phone) {
        user.login_type = login_type;
        return user.clone();
    }

    let user = match state.config.users.get(phone) {
        Some(known) => DevUser {
            id: known.id.clone(),
            name: known.name.clone(),
            phone: phone.to_string(),
            login_type,
            extra_modules: known.modules.clone(),
        },
        None => {
            let suffix: String = phone
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            DevUser {
                id: uuid::Uuid::new_v4().to_string(),
                name: format!("User {}", suffix),
                phone: phone.to_string(),
                login_type,
                extra_modules: Vec::new(),
            }
        }
    };

    tracing::info!("Provisioned dev user {} for {}", user.id, phone);
    state.users.insert(phone.to_string(), user.clone());
    user
}

/// Mint an access token and a fresh refresh token for `user`
fn issue_tokens(state: &mut AppState, user: &DevUser) -> Result<(String, String), ApiError> {
    let claims = Claims::new(
        &user.id,
        &user.phone,
        user.login_type,
        state.config.token_ttl_secs,
    );
    let access = create_token(&claims, &state.config.jwt_secret)
        .map_err(|e| reject(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

    let refresh = uuid::Uuid::new_v4().to_string();
    state.refresh_grants.insert(
        refresh.clone(),
        RefreshGrant {
            phone: user.phone.clone(),
            access_jti: claims.jti,
            expires_at: claims.iat + state.config.refresh_ttl_secs,
        },
    );
    Ok((access, refresh))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller from the bearer token, rejecting revoked tokens
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(Claims, DevUser), ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    let claims = validate_token(token, &state.config.jwt_secret)
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid or expired token"))?;

    if state.is_revoked(&claims.jti) {
        return Err(reject(StatusCode::UNAUTHORIZED, "token has been revoked"));
    }

    let user = state
        .users
        .get(&claims.phone)
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "unknown user"))?;
    Ok((claims, user))
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

// Auth routes

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginBody>,
) -> Result<Json<LoginPayload>, ApiError> {
    let mut state = state.write().await;

    if req.phone.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "phone is required"));
    }
    if req.code != state.config.sms_code {
        tracing::debug!("Rejected login for {}: wrong code", req.phone);
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid verification code"));
    }

    state.prune_expired(chrono::Utc::now().timestamp());
    let user = provision_user(&mut state, &req.phone, req.login_type);
    let (token, refresh_token) = issue_tokens(&mut state, &user)?;
    let role = role_for(user.login_type);

    Ok(Json(LoginPayload {
        token,
        refresh_token,
        expires_in: state.config.token_ttl_secs,
        user: LoginUserPayload {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            phone: user.phone.clone(),
            modules: modules_for(&user),
            roles: vec![role],
        },
    }))
}

pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let mut state = state.write().await;
    let (claims, user) = authorize(&state, &headers)?;

    state.revoke(&claims.jti, claims.exp);
    state.prune_expired(chrono::Utc::now().timestamp());
    tracing::info!("User {} logged out", user.id);

    Ok(Json(json!({ "success": true })))
}

pub async fn verify(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let state = state.read().await;
    let (claims, user) = authorize(&state, &headers)?;

    Ok(Json(json!({
        "valid": true,
        "user_id": user.id,
        "expires_at": claims.exp,
    })))
}

pub async fn permissions(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<PermissionsPayload>, ApiError> {
    let state = state.read().await;
    let (_claims, user) = authorize(&state, &headers)?;

    Ok(Json(PermissionsPayload {
        available_modules: modules_for(&user),
        user: PermissionsUserPayload {
            id: user.id,
            name: user.name,
            phone: user.phone,
        },
    }))
}

pub async fn refresh(
    State(state): State<SharedState>,
    Json(req): Json<RefreshBody>,
) -> Result<Json<RefreshPayload>, ApiError> {
    let mut state = state.write().await;

    // Refresh tokens are single-use
    let grant = state
        .refresh_grants
        .remove(&req.refresh_token)
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "invalid refresh token"))?;

    if state.is_revoked(&grant.access_jti) {
        return Err(reject(StatusCode::UNAUTHORIZED, "session has been revoked"));
    }
    let now = chrono::Utc::now().timestamp();
    if grant.expires_at < now {
        return Err(reject(StatusCode::UNAUTHORIZED, "refresh token has expired"));
    }
    state.prune_expired(now);

    let user = state
        .users
        .get(&grant.phone)
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "unknown user"))?;
    let (token, refresh_token) = issue_tokens(&mut state, &user)?;

    Ok(Json(RefreshPayload {
        token,
        expires_in: state.config.token_ttl_secs,
        refresh_token: Some(refresh_token),
    }))
}
