// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity catalog routes.

use crate::error::{AppError, Result};
use crate::models::{Activity, City};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

/// Catalog routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities/city/{city}", get(list_by_city))
        .route("/api/activities/{activity_id}", get(get_activity))
}

async fn list_by_city(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<Json<Vec<Activity>>> {
    let city: City = city.parse().map_err(AppError::BadRequest)?;
    Ok(Json(state.catalog.list_by_city(city).await?))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> Result<Json<Activity>> {
    Ok(Json(state.catalog.get(&activity_id).await?))
}
