// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip, participant and trip-activity routes.
//!
//! All handlers return the affected trip with references resolved.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{TripDetails, TripStatus};
use crate::routes::json::JsonBody;
use crate::services::{NewTrip, TripUpdate};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Trip routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trips", get(list_trips).post(create_trip))
        .route(
            "/api/trips/{trip_id}",
            get(get_trip).put(update_trip).delete(delete_trip),
        )
        .route("/api/trips/{trip_id}/participants", post(add_participant))
        .route(
            "/api/trips/{trip_id}/participants/{user_id}",
            delete(remove_participant),
        )
        .route("/api/trips/{trip_id}/activities", post(add_activity))
        .route(
            "/api/trips/{trip_id}/activities/{activity_id}",
            delete(remove_activity),
        )
        .route(
            "/api/trips/{trip_id}/activities/{activity_id}/participants",
            post(add_activity_participant),
        )
        .route(
            "/api/trips/{trip_id}/activities/{activity_id}/participants/{user_id}",
            delete(remove_activity_participant),
        )
}

#[derive(Deserialize)]
pub struct ListTripsParams {
    status: Option<TripStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdBody {
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddActivityBody {
    activity_id: String,
    #[serde(default)]
    participants: Vec<String>,
}

async fn list_trips(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListTripsParams>,
) -> Result<Json<Vec<TripDetails>>> {
    let trips = state
        .membership
        .list_trips(&auth.user_id, params.status)
        .await?;

    let mut details = Vec::with_capacity(trips.len());
    for trip in trips {
        details.push(state.membership.details(trip).await?);
    }
    Ok(Json(details))
}

async fn create_trip(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(body): JsonBody<NewTrip>,
) -> Result<(StatusCode, Json<TripDetails>)> {
    let trip = state.membership.create_trip(&auth.user_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(state.membership.details(trip).await?),
    ))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripDetails>> {
    let trip = state.membership.get_trip(&auth.user_id, &trip_id).await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn update_trip(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    JsonBody(patch): JsonBody<TripUpdate>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .update_trip(&auth.user_id, &trip_id, patch)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn delete_trip(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode> {
    state.membership.delete_trip(&auth.user_id, &trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_participant(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    JsonBody(body): JsonBody<UserIdBody>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .add_participant(&auth.user_id, &trip_id, &body.user_id)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn remove_participant(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((trip_id, user_id)): Path<(String, String)>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .remove_participant(&auth.user_id, &trip_id, &user_id)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn add_activity(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    JsonBody(body): JsonBody<AddActivityBody>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .add_activity(&auth.user_id, &trip_id, &body.activity_id, &body.participants)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn remove_activity(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((trip_id, activity_id)): Path<(String, String)>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .remove_activity(&auth.user_id, &trip_id, &activity_id)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn add_activity_participant(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((trip_id, activity_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<UserIdBody>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .add_activity_participant(&auth.user_id, &trip_id, &activity_id, &body.user_id)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}

async fn remove_activity_participant(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((trip_id, activity_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<TripDetails>> {
    let trip = state
        .membership
        .remove_activity_participant(&auth.user_id, &trip_id, &activity_id, &user_id)
        .await?;
    Ok(Json(state.membership.details(trip).await?))
}
