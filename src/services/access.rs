// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip authorization gate.
//!
//! Every participant has the same privileges; the only rule is membership.
//! Existence is always checked before membership, so a missing trip is
//! reported as `NotFound` even to non-participants.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::Trip;

pub fn trip_not_found(trip_id: &str) -> AppError {
    AppError::NotFound(format!("Trip {} not found", trip_id))
}

/// Fail with `Forbidden` unless `user_id` is a participant of `trip`.
pub fn require_participant(trip: &Trip, user_id: &str) -> Result<()> {
    if trip.is_participant(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not a participant of this trip".to_string(),
        ))
    }
}

/// Load a trip the acting user is allowed to see or modify.
pub async fn load_trip_for(db: &Db, trip_id: &str, user_id: &str) -> Result<Trip> {
    let trip = db
        .get_trip(trip_id)
        .await?
        .ok_or_else(|| trip_not_found(trip_id))?;

    if let Err(e) = require_participant(&trip, user_id) {
        tracing::warn!(trip_id, user_id, "Blocked non-participant trip access");
        return Err(e);
    }

    Ok(trip)
}
