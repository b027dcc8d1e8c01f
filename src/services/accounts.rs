// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local accounts and Google account provisioning.
//!
//! Passwords are hashed with Argon2id on the blocking pool. Username and
//! email uniqueness is checked before insert; two registrations racing on
//! the same name can both pass the check.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{AuthProvider, KeyedList, User};
use crate::services::google_oauth::GoogleProfile;
use crate::time_utils::now_rfc3339;
use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

const USERNAME_MIN: usize = 6;
const USERNAME_MAX: usize = 30;
const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) || !username.chars().all(is_username_char) {
        return Err(ValidationError::new("username").with_message(
            "Username must be 6-30 characters of letters, numbers, underscores or dashes".into(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> std::result::Result<(), ValidationError> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if password.len() < 8 || !allowed || !has_letter || !has_digit {
        return Err(ValidationError::new("password").with_message(
            "Password must be at least 8 characters with at least one letter and one number"
                .into(),
        ));
    }
    Ok(())
}

/// Body of `POST /api/users/register`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

/// Body of `POST /api/users/login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> std::result::Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {}", e))
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> std::result::Result<bool, String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Build a username candidate from an email address.
fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut username: String = local
        .chars()
        .filter(|c| is_username_char(*c))
        .take(USERNAME_MAX)
        .collect();
    while username.len() < USERNAME_MIN {
        username.push('_');
    }
    username
}

fn incorrect_credentials() -> AppError {
    AppError::BadRequest("Incorrect email or password.".to_string())
}

#[derive(Clone)]
pub struct AccountService {
    db: Db,
}

impl AccountService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }
        if self
            .db
            .find_user_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| anyhow!("Hashing task failed: {}", e))?
            .map_err(|e| anyhow!(e))?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: request.username,
            email,
            password_hash: Some(password_hash),
            provider: AuthProvider::Local,
            google_id: None,
            trips: Vec::new(),
            activities: KeyedList::new(),
            budgets: KeyedList::new(),
            created_at: now_rfc3339(),
        };
        self.db.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<User> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::BadRequest(
                "Email and password are required.".to_string(),
            ));
        }

        let user = self
            .db
            .find_user_by_email(request.email.trim())
            .await?
            .ok_or_else(incorrect_credentials)?;

        // OAuth-only accounts have no password to check
        let Some(hash) = user.password_hash.clone() else {
            return Err(incorrect_credentials());
        };

        let password = request.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| anyhow!("Verification task failed: {}", e))?
            .map_err(|e| anyhow!(e))?;

        if !matches {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(incorrect_credentials());
        }

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Find or create the account for a Google identity.
    ///
    /// Lookup order: Google subject ID, then a verified email match (which
    /// links the Google ID to the existing account), then a new account.
    pub async fn provision_google_user(&self, profile: &GoogleProfile) -> Result<User> {
        if let Some(user) = self.db.find_user_by_google_id(&profile.sub).await? {
            return Ok(user);
        }

        let email = profile.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::OAuth("Google profile has no email".to_string()));
        }

        if let Some(existing) = self.db.find_user_by_email(&email).await? {
            if !profile.email_verified {
                return Err(AppError::Conflict(
                    "Email is already registered".to_string(),
                ));
            }
            let google_id = profile.sub.clone();
            let linked = self
                .db
                .update_user(&existing.id, |user| {
                    user.google_id = Some(google_id);
                    Ok(())
                })
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", existing.id)))?;
            tracing::info!(user_id = %linked.id, "Linked Google account to existing user");
            return Ok(linked);
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: self.unique_username(&email).await?,
            email,
            password_hash: None,
            provider: AuthProvider::Google,
            google_id: Some(profile.sub.clone()),
            trips: Vec::new(),
            activities: KeyedList::new(),
            budgets: KeyedList::new(),
            created_at: now_rfc3339(),
        };
        self.db.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "Provisioned Google user");
        Ok(user)
    }

    async fn unique_username(&self, email: &str) -> Result<String> {
        let base = username_from_email(email);
        if self.db.find_user_by_username(&base).await?.is_none() {
            return Ok(base);
        }

        for _ in 0..5 {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let stem: String = base.chars().take(USERNAME_MAX - 7).collect();
            let candidate = format!("{}-{}", stem, &suffix[..6]);
            if self.db.find_user_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(AppError::Conflict(
            "Could not derive a free username".to_string(),
        ))
    }
}
