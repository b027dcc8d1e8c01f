// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use trip_planner::config::Config;
use trip_planner::db::{Db, MemoryStore};
use trip_planner::middleware::auth::create_jwt;
use trip_planner::models::{Activity, AuthProvider, City, KeyedList, User};
use trip_planner::routes::create_router;
use trip_planner::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Build a router around an existing store.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config, db: Db) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Create a test app over an empty in-memory store.
/// Returns the router, the shared state and the store (for fault injection).
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let (app, state) = create_test_app_with(Config::default(), Db::with_memory(store.clone()));
    (app, state, store)
}

/// Insert a local user directly into the store.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, id: &str) -> User {
    let user = User {
        id: id.to_string(),
        username: format!("{}_user", id),
        email: format!("{}@example.com", id),
        password_hash: None,
        provider: AuthProvider::Local,
        google_id: None,
        trips: Vec::new(),
        activities: KeyedList::new(),
        budgets: KeyedList::new(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
    };
    state.db.create_user(&user).await.expect("seed user");
    user
}

#[allow(dead_code)]
pub async fn seed_activity(state: &AppState, id: &str, city: City) -> Activity {
    let activity = Activity {
        id: id.to_string(),
        title: format!("Activity {}", id),
        description: "Something to do".to_string(),
        location: "Downtown".to_string(),
        city,
        price: 10.0,
        image_url: "https://example.com/a.jpg".to_string(),
        tags: Vec::new(),
        created_at: String::new(),
        updated_at: String::new(),
    };
    state.db.upsert_activity(&activity).await.expect("seed activity");
    activity
}

/// Session token for a seeded user.
#[allow(dead_code)]
pub fn token_for(state: &AppState, user: &User) -> String {
    create_jwt(user, &state.config.jwt_signing_key).expect("create jwt")
}

/// Send a JSON request with a bearer token and decode the JSON response.
/// Empty response bodies decode to `Value::Null`.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
