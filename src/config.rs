//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use std::env;

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Google OAuth client settings. OAuth routes are disabled without them.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with Google
    pub callback_url: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and OAuth redirects
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// JSON file of catalog activities loaded at startup
    pub activity_seed_path: Option<String>,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    pub google: Option<GoogleOAuthConfig>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 4001,
            store_backend: StoreBackend::Memory,
            activity_seed_path: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!".to_vec(),
            google: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.trim().as_bytes().to_vec())
            .unwrap_or_else(|_| jwt_signing_key.clone());

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "4001".to_string())
                .parse()
                .unwrap_or(4001),
            store_backend,
            activity_seed_path: env::var("ACTIVITY_SEED_PATH").ok(),
            jwt_signing_key,
            oauth_state_key,
            google: google_from_env()?,
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Google settings are all-or-nothing: a partial set is a configuration error.
fn google_from_env() -> Result<Option<GoogleOAuthConfig>, ConfigError> {
    let client_id = env::var("GOOGLE_CLIENT_ID").ok();
    let client_secret = env::var("GOOGLE_CLIENT_SECRET").ok();
    let callback_url = env::var("GOOGLE_CALLBACK_URL").ok();

    match (client_id, client_secret, callback_url) {
        (None, None, None) => Ok(None),
        (Some(client_id), Some(client_secret), Some(callback_url)) => {
            Ok(Some(GoogleOAuthConfig {
                client_id: client_id.trim().to_string(),
                client_secret: client_secret.trim().to_string(),
                callback_url: callback_url.trim().to_string(),
            }))
        }
        (None, _, _) => Err(ConfigError::Missing("GOOGLE_CLIENT_ID")),
        (_, None, _) => Err(ConfigError::Missing("GOOGLE_CLIENT_SECRET")),
        (_, _, None) => Err(ConfigError::Missing("GOOGLE_CALLBACK_URL")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
