// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth authentication routes.
//!
//! Both routes answer 404 when Google credentials are not configured.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::routes::users::start_session;
use crate::services::GoogleOAuth;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
}

fn google(state: &AppState) -> Result<&GoogleOAuth> {
    state
        .google_oauth
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))
}

/// Start OAuth flow - redirect to the Google consent screen.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let auth_url = google(&state)?.authorization_url()?;
    tracing::info!("Starting OAuth flow, redirecting to Google");
    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, provision the account, start a session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let oauth = google(&state)?;
    let frontend_url = state.config.frontend_url.trim_end_matches('/');
    let fail = |reason: &str| {
        Redirect::temporary(&format!(
            "{}/login?error={}",
            frontend_url,
            urlencoding::encode(reason)
        ))
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Ok((jar, fail(&error)));
    }

    if !oauth.verify_state(&params.state) {
        tracing::warn!("Invalid or expired OAuth state parameter");
        return Ok((jar, fail("invalid_state")));
    }

    let Some(code) = params.code else {
        return Ok((jar, fail("missing_code")));
    };

    let profile = oauth.fetch_profile(&code).await?;
    let user = state.accounts.provision_google_user(&profile).await?;
    tracing::info!(user_id = %user.id, "OAuth successful");

    let (jar, _) = start_session(&state, jar, user)?;
    Ok((jar, Redirect::temporary(frontend_url)))
}
