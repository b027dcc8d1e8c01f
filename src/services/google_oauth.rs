// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 authorization-code flow.
//!
//! Handles:
//! - Building the consent-screen URL with a signed, expiring `state`
//! - Exchanging the authorization code for an access token
//! - Fetching the OpenID userinfo profile

use crate::config::GoogleOAuthConfig;
use crate::error::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a consent round-trip may take.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Subset of the OpenID userinfo response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account ID
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn unix_millis() -> Result<u128, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))
}

/// Create a `state` value: `base64("nonce|timestamp_hex|signature_hex")`.
pub fn sign_state(secret: &[u8], issued_at_ms: u128) -> Result<String, AppError> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let payload = format!("{}|{:x}", nonce, issued_at_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Check a `state` value's signature and age.
pub fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> bool {
    let Some(decoded) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = decoded.splitn(3, '|').collect();
    let &[nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce, timestamp_hex).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::warn!("OAuth state signature mismatch");
        return false;
    }

    let Ok(issued_at) = u128::from_str_radix(timestamp_hex, 16) else {
        return false;
    };
    issued_at <= now_ms && now_ms - issued_at <= STATE_TTL.as_millis()
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    config: GoogleOAuthConfig,
    state_key: Vec<u8>,
}

impl GoogleOAuth {
    pub fn new(config: GoogleOAuthConfig, state_key: Vec<u8>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            config,
            state_key,
        })
    }

    /// Consent-screen URL for a fresh login attempt.
    pub fn authorization_url(&self) -> Result<String, AppError> {
        let state = sign_state(&self.state_key, unix_millis()?)?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(SCOPES),
            state
        ))
    }

    pub fn verify_state(&self, state: &str) -> bool {
        match unix_millis() {
            Ok(now) => verify_state(state, &self.state_key, now),
            Err(_) => false,
        }
    }

    /// Exchange an authorization code and fetch the user's profile.
    pub async fn fetch_profile(&self, code: &str) -> Result<GoogleProfile, AppError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Token request failed: {}", e)))?;
        let token: TokenResponse = check_response_json(response).await?;

        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Userinfo request failed: {}", e)))?;
        check_response_json(response).await
    }
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::OAuth(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::OAuth(format!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"secret_key";
    const ISSUED: u128 = 1_700_000_000_000;

    #[test]
    fn test_state_roundtrip() {
        let state = sign_state(SECRET, ISSUED).unwrap();
        assert!(verify_state(&state, SECRET, ISSUED));
        assert!(verify_state(&state, SECRET, ISSUED + 60_000));
    }

    #[test]
    fn test_state_expires() {
        let state = sign_state(SECRET, ISSUED).unwrap();
        let too_late = ISSUED + STATE_TTL.as_millis() + 1;
        assert!(!verify_state(&state, SECRET, too_late));
        // Issued in the future
        assert!(!verify_state(&state, SECRET, ISSUED - 1));
    }

    #[test]
    fn test_state_wrong_secret() {
        let state = sign_state(SECRET, ISSUED).unwrap();
        assert!(!verify_state(&state, b"wrong_key", ISSUED));
    }

    #[test]
    fn test_state_tampered_timestamp() {
        let state = sign_state(SECRET, ISSUED).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let parts: Vec<&str> = decoded.splitn(3, '|').collect();
        let forged = format!("{}|{:x}|{}", parts[0], ISSUED + 1, parts[2]);
        let forged = URL_SAFE_NO_PAD.encode(forged);
        assert!(!verify_state(&forged, SECRET, ISSUED + 1));
    }

    #[test]
    fn test_state_malformed() {
        assert!(!verify_state("not base64!", SECRET, ISSUED));
        assert!(!verify_state(&URL_SAFE_NO_PAD.encode("invalid|format"), SECRET, ISSUED));
    }

    #[test]
    fn test_authorization_url() {
        let oauth = GoogleOAuth::new(
            GoogleOAuthConfig {
                client_id: "client-123".to_string(),
                client_secret: "shh".to_string(),
                callback_url: "http://localhost:4001/auth/google/callback".to_string(),
            },
            SECRET.to_vec(),
        )
        .unwrap();

        let url = oauth.authorization_url().unwrap();
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A4001%2Fauth%2Fgoogle%2Fcallback"));
        assert!(!url.contains("shh"));

        let state = url.rsplit("state=").next().unwrap();
        assert!(oauth.verify_state(state));
    }
}
