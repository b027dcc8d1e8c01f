// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and budget routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::{clear_session_cookie, create_jwt, session_cookie, AuthUser};
use crate::models::{User, UserProfile, UserSummary};
use crate::routes::json::JsonBody;
use crate::services::{LoginRequest, RegisterRequest, SetBudgetRequest};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
}

/// Routes requiring a session. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/me", get(get_me))
        .route("/api/users/budgets", post(set_budget))
        .route("/api/users/{user_id}", get(get_user))
}

/// Response for a successful login or registration.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Issue a session token for `user` and attach it as a cookie.
pub(crate) fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, SessionResponse)> {
    let token = create_jwt(&user, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies()));
    Ok((
        jar,
        SessionResponse {
            token,
            user: user.into(),
        },
    ))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state.accounts.register(request).await?;
    let (jar, session) = start_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, Json(session)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = state.accounts.login(request).await?;
    let (jar, session) = start_session(&state, jar, user)?;
    Ok((jar, Json(session)))
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        clear_session_cookie(jar, state.config.secure_cookies()),
    )
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let user = state.accounts.get_user(&auth.user_id).await?;
    Ok(Json(user.into()))
}

/// A user as seen by the caller: the full profile for themselves, only the
/// public summary for anyone else. Budgets and activity mirrors stay private.
#[derive(Serialize)]
#[serde(untagged)]
enum UserView {
    Own(UserProfile),
    Other(UserSummary),
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>> {
    let user = state.accounts.get_user(&user_id).await?;
    if user.id == auth.user_id {
        return Ok(Json(UserView::Own(user.into())));
    }
    Ok(Json(UserView::Other(UserSummary::from(&user))))
}

async fn set_budget(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(request): JsonBody<SetBudgetRequest>,
) -> Result<Json<UserProfile>> {
    let profile = state.budgets.set_budget(&auth.user_id, request).await?;
    Ok(Json(profile))
}
