// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip membership and activity assignment.
//!
//! Keeps two families of cross-document references in agreement:
//! 1. `Trip.participants` ↔ `User.trips`
//! 2. `Trip.activities[].participants` ↔ `User.activities[tripId].activityIds`
//!
//! The store offers no multi-document transactions. Each operation is a
//! fixed sequence of single-document atomic updates: the trip first (its
//! closure re-runs the authorization gate and the duplicate checks against
//! the committed document), then one update per affected user, in list
//! order. A failing user update stops the sequence and its error is
//! returned as-is; earlier writes stay applied. Trip deletion is the
//! exception to trip-first ordering: users are detached before the trip
//! document is removed, so a failure leaves the trip in place.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{
    Activity, City, Trip, TripActivityDetails, TripDetails, TripStatus, User, UserSummary,
};
use crate::services::access::{self, trip_not_found};
use crate::time_utils::{deserialize_calendar_date, deserialize_optional_calendar_date, now_rfc3339};
use chrono::NaiveDate;
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

const MAX_CONCURRENT_DB_OPS: usize = 16;

/// Body of `POST /api/trips`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    #[validate(length(min = 4, message = "Title must be at least 4 characters"))]
    pub title: String,
    #[validate(length(min = 4, message = "Description must be at least 4 characters"))]
    pub description: String,
    pub city: City,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_exact: bool,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Body of `PUT /api/trips/{id}`. Membership is changed through the
/// dedicated participant and activity endpoints, never here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
    #[validate(length(min = 4, message = "Title must be at least 4 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 4, message = "Description must be at least 4 characters"))]
    pub description: Option<String>,
    pub city: Option<City>,
    #[serde(default, deserialize_with = "deserialize_optional_calendar_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_calendar_date")]
    pub end_date: Option<NaiveDate>,
    pub is_exact: Option<bool>,
    pub status: Option<TripStatus>,
}

impl TripUpdate {
    fn apply(self, trip: &mut Trip) -> Result<()> {
        if let Some(title) = self.title {
            trip.title = title;
        }
        if let Some(description) = self.description {
            trip.description = description;
        }
        if let Some(city) = self.city {
            trip.city = city;
        }
        if let Some(start_date) = self.start_date {
            trip.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            trip.end_date = end_date;
        }
        if let Some(is_exact) = self.is_exact {
            trip.is_exact = is_exact;
        }
        if let Some(status) = self.status {
            trip.status = status;
        }
        check_dates(trip.start_date, trip.end_date)
    }
}

fn check_dates(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(AppError::BadRequest(
            "End date must not be before start date".to_string(),
        ));
    }
    Ok(())
}

fn user_not_found(user_id: &str) -> AppError {
    AppError::NotFound(format!("User {} not found", user_id))
}

fn activity_not_on_trip(activity_id: &str) -> AppError {
    AppError::NotFound(format!("Activity {} is not part of this trip", activity_id))
}

/// Order-preserving de-duplication.
fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if !id.is_empty() && !unique.iter().any(|u| u == id) {
            unique.push(id.to_string());
        }
    }
    unique
}

/// Membership consistency engine.
#[derive(Clone)]
pub struct MembershipService {
    db: Db,
}

impl MembershipService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    // ─── Step Sequencing ─────────────────────────────────────────

    /// Apply `step` to each user document in order.
    ///
    /// Users that no longer exist are skipped. The first store error aborts
    /// the remaining steps and is returned unchanged.
    async fn fan_out<F>(
        &self,
        operation: &'static str,
        trip_id: &str,
        user_ids: &[String],
        step: F,
    ) -> Result<()>
    where
        F: Fn(&mut User) + Sync,
    {
        for (completed, user_id) in user_ids.iter().enumerate() {
            let result = self
                .db
                .update_user(user_id, |user| {
                    step(user);
                    Ok(())
                })
                .await;

            match result {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(
                        operation,
                        trip_id,
                        user_id = %user_id,
                        "Fan-out target user missing, skipped"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        operation,
                        trip_id,
                        user_id = %user_id,
                        completed,
                        remaining = user_ids.len() - completed,
                        error = %e,
                        "Fan-out aborted, documents left partially updated"
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Atomically mutate a trip the actor participates in.
    async fn mutate_trip<F>(&self, actor: &str, trip_id: &str, mutate: F) -> Result<Trip>
    where
        F: FnOnce(&mut Trip) -> Result<()> + Send,
    {
        let updated = self
            .db
            .update_trip(trip_id, |trip| {
                access::require_participant(trip, actor)?;
                mutate(trip)?;
                trip.updated_at = now_rfc3339();
                Ok(())
            })
            .await?;

        updated.ok_or_else(|| trip_not_found(trip_id))
    }

    // ─── Trips ───────────────────────────────────────────────────

    /// Create a trip and add it to every participant's trip list.
    ///
    /// Participants are stored as given, minus duplicates. The creator must
    /// be one of them.
    pub async fn create_trip(&self, actor: &str, input: NewTrip) -> Result<Trip> {
        input.validate()?;
        check_dates(input.start_date, input.end_date)?;

        if input.participants.is_empty() {
            return Err(AppError::BadRequest(
                "At least one participant is required".to_string(),
            ));
        }

        let participants = dedup_ids(&input.participants);
        if !participants.iter().any(|p| p == actor) {
            return Err(AppError::BadRequest(
                "The trip creator must be a participant".to_string(),
            ));
        }

        for user_id in &participants {
            if self.db.get_user(user_id).await?.is_none() {
                return Err(user_not_found(user_id));
            }
        }

        let now = now_rfc3339();
        let trip = Trip {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            city: input.city,
            start_date: input.start_date,
            end_date: input.end_date,
            is_exact: input.is_exact,
            status: input.status,
            participants,
            activities: Default::default(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.create_trip(&trip).await?;
        tracing::info!(
            trip_id = %trip.id,
            actor,
            participants = trip.participants.len(),
            "Trip created"
        );

        self.fan_out("create_trip", &trip.id, &trip.participants, |user| {
            user.add_trip(&trip.id);
        })
        .await?;

        Ok(trip)
    }

    /// Trips the actor belongs to, in join order.
    pub async fn list_trips(&self, actor: &str, status: Option<TripStatus>) -> Result<Vec<Trip>> {
        let user = self
            .db
            .get_user(actor)
            .await?
            .ok_or_else(|| user_not_found(actor))?;

        let db = &self.db;
        let loaded: Vec<Result<Option<Trip>>> = stream::iter(user.trips.clone())
            .map(|trip_id| async move { db.get_trip(&trip_id).await })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut trips = Vec::with_capacity(loaded.len());
        for (trip_id, trip) in user.trips.iter().zip(loaded) {
            match trip? {
                Some(trip) if status.map_or(true, |s| s == trip.status) => trips.push(trip),
                Some(_) => {}
                None => tracing::warn!(actor, trip_id = %trip_id, "Dangling trip reference"),
            }
        }
        Ok(trips)
    }

    pub async fn get_trip(&self, actor: &str, trip_id: &str) -> Result<Trip> {
        access::load_trip_for(&self.db, trip_id, actor).await
    }

    /// Patch scalar trip fields.
    pub async fn update_trip(&self, actor: &str, trip_id: &str, patch: TripUpdate) -> Result<Trip> {
        patch.validate()?;
        let trip = self
            .mutate_trip(actor, trip_id, move |trip| patch.apply(trip))
            .await?;
        tracing::info!(trip_id, actor, "Trip updated");
        Ok(trip)
    }

    /// Detach the trip from every participant, then delete it.
    pub async fn delete_trip(&self, actor: &str, trip_id: &str) -> Result<()> {
        let trip = access::load_trip_for(&self.db, trip_id, actor).await?;

        self.fan_out("delete_trip", trip_id, &trip.participants, |user| {
            user.forget_trip(trip_id);
        })
        .await?;

        self.db.delete_trip(trip_id).await?;
        tracing::info!(trip_id, actor, "Trip deleted");
        Ok(())
    }

    // ─── Participants ────────────────────────────────────────────

    pub async fn add_participant(&self, actor: &str, trip_id: &str, user_id: &str) -> Result<Trip> {
        access::load_trip_for(&self.db, trip_id, actor).await?;

        if self.db.get_user(user_id).await?.is_none() {
            return Err(user_not_found(user_id));
        }

        let trip = self
            .mutate_trip(actor, trip_id, |trip| {
                if trip.add_participant(user_id) {
                    Ok(())
                } else {
                    Err(AppError::Conflict(
                        "User is already a participant".to_string(),
                    ))
                }
            })
            .await?;

        self.fan_out("add_participant", trip_id, &[user_id.to_string()], |user| {
            user.add_trip(trip_id);
        })
        .await?;

        tracing::info!(trip_id, actor, user_id, "Participant added");
        Ok(trip)
    }

    /// Remove a participant from the trip and from all of its activities.
    pub async fn remove_participant(
        &self,
        actor: &str,
        trip_id: &str,
        user_id: &str,
    ) -> Result<Trip> {
        let trip = self
            .mutate_trip(actor, trip_id, |trip| {
                if !trip.is_participant(user_id) {
                    return Err(AppError::NotFound(format!(
                        "User {} is not a participant of this trip",
                        user_id
                    )));
                }
                if trip.participants.len() == 1 {
                    return Err(AppError::BadRequest(
                        "Cannot remove the last participant; delete the trip instead".to_string(),
                    ));
                }
                trip.remove_participant(user_id);
                Ok(())
            })
            .await?;

        self.fan_out(
            "remove_participant",
            trip_id,
            &[user_id.to_string()],
            |user| {
                user.remove_trip(trip_id);
                user.drop_trip_activities(trip_id);
            },
        )
        .await?;

        tracing::info!(trip_id, actor, user_id, "Participant removed");
        Ok(trip)
    }

    // ─── Trip Activities ─────────────────────────────────────────

    /// Plan a catalog activity for some of the trip's participants.
    pub async fn add_activity(
        &self,
        actor: &str,
        trip_id: &str,
        activity_id: &str,
        participant_ids: &[String],
    ) -> Result<Trip> {
        let current = access::load_trip_for(&self.db, trip_id, actor).await?;

        let participants = dedup_ids(participant_ids);
        if participants.is_empty() {
            return Err(AppError::BadRequest(
                "At least one participant is required".to_string(),
            ));
        }
        if let Some(outsider) = participants.iter().find(|p| !current.is_participant(p)) {
            return Err(AppError::BadRequest(format!(
                "User {} is not a participant of this trip",
                outsider
            )));
        }

        if self.db.get_activity(activity_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Activity {} not found",
                activity_id
            )));
        }

        let assigned = participants.clone();
        let trip = self
            .mutate_trip(actor, trip_id, move |trip| {
                if let Some(outsider) = assigned.iter().find(|p| !trip.is_participant(p)) {
                    return Err(AppError::BadRequest(format!(
                        "User {} is not a participant of this trip",
                        outsider
                    )));
                }
                if trip.add_activity(activity_id, assigned) {
                    Ok(())
                } else {
                    Err(AppError::Conflict("Activity already added".to_string()))
                }
            })
            .await?;

        self.fan_out("add_activity", trip_id, &participants, |user| {
            user.add_trip_activity(trip_id, activity_id);
        })
        .await?;

        tracing::info!(
            trip_id,
            actor,
            activity_id,
            participants = participants.len(),
            "Activity added to trip"
        );
        Ok(trip)
    }

    /// Remove an activity from the trip.
    ///
    /// Only the acting user's mirror entry is cleared; other former
    /// assignees keep the activity ID in their `activities` list.
    pub async fn remove_activity(&self, actor: &str, trip_id: &str, activity_id: &str) -> Result<Trip> {
        let mut former: Vec<String> = Vec::new();
        let trip = self
            .mutate_trip(actor, trip_id, |trip| {
                let removed = trip
                    .remove_activity(activity_id)
                    .ok_or_else(|| activity_not_on_trip(activity_id))?;
                former = removed.participants;
                Ok(())
            })
            .await?;

        self.fan_out("remove_activity", trip_id, &[actor.to_string()], |user| {
            user.remove_trip_activity(trip_id, activity_id);
        })
        .await?;

        tracing::info!(
            trip_id,
            actor,
            activity_id,
            stale_mirrors = former.iter().filter(|p| p.as_str() != actor).count(),
            "Activity removed from trip"
        );
        Ok(trip)
    }

    /// Assign a trip participant to an activity already on the trip.
    pub async fn add_activity_participant(
        &self,
        actor: &str,
        trip_id: &str,
        activity_id: &str,
        user_id: &str,
    ) -> Result<Trip> {
        let trip = self
            .mutate_trip(actor, trip_id, |trip| {
                if !trip.activities.contains_key(activity_id) {
                    return Err(activity_not_on_trip(activity_id));
                }
                if !trip.is_participant(user_id) {
                    return Err(AppError::BadRequest(format!(
                        "User {} is not a participant of this trip",
                        user_id
                    )));
                }
                let entry = trip
                    .activities
                    .get_mut(activity_id)
                    .ok_or_else(|| activity_not_on_trip(activity_id))?;
                if entry.participants.iter().any(|p| p == user_id) {
                    return Err(AppError::Conflict(
                        "User is already assigned to this activity".to_string(),
                    ));
                }
                entry.participants.push(user_id.to_string());
                Ok(())
            })
            .await?;

        self.fan_out(
            "add_activity_participant",
            trip_id,
            &[user_id.to_string()],
            |user| {
                user.add_trip_activity(trip_id, activity_id);
            },
        )
        .await?;

        tracing::info!(trip_id, actor, activity_id, user_id, "Activity participant added");
        Ok(trip)
    }

    /// Unassign a user from a trip activity. The activity stays on the trip
    /// even if nobody is left on it.
    pub async fn remove_activity_participant(
        &self,
        actor: &str,
        trip_id: &str,
        activity_id: &str,
        user_id: &str,
    ) -> Result<Trip> {
        let trip = self
            .mutate_trip(actor, trip_id, |trip| {
                let entry = trip
                    .activities
                    .get_mut(activity_id)
                    .ok_or_else(|| activity_not_on_trip(activity_id))?;
                if !entry.participants.iter().any(|p| p == user_id) {
                    return Err(AppError::NotFound(format!(
                        "User {} is not assigned to this activity",
                        user_id
                    )));
                }
                entry.participants.retain(|p| p != user_id);
                Ok(())
            })
            .await?;

        self.fan_out(
            "remove_activity_participant",
            trip_id,
            &[user_id.to_string()],
            |user| {
                user.remove_trip_activity(trip_id, activity_id);
            },
        )
        .await?;

        tracing::info!(trip_id, actor, activity_id, user_id, "Activity participant removed");
        Ok(trip)
    }

    // ─── Views ───────────────────────────────────────────────────

    /// Resolve participant and activity references for an API response.
    ///
    /// Dangling references are dropped from participant lists and reported
    /// as `activity: null` for activities.
    pub async fn details(&self, trip: Trip) -> Result<TripDetails> {
        let mut user_ids: Vec<String> = trip.participants.clone();
        for activity in &trip.activities {
            for p in &activity.participants {
                if !user_ids.contains(p) {
                    user_ids.push(p.clone());
                }
            }
        }
        let activity_ids: Vec<String> = trip
            .activities
            .iter()
            .map(|a| a.activity_id.clone())
            .collect();

        let db = &self.db;
        let users: HashMap<String, UserSummary> = stream::iter(user_ids)
            .map(|id| async move {
                let user = db.get_user(&id).await?;
                Ok::<_, AppError>(user.map(|u| (id, UserSummary::from(&u))))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<(String, UserSummary)>>>>()
            .await
            .into_iter()
            .filter_map(|r| r.transpose())
            .collect::<Result<_>>()?;

        let activities: HashMap<String, Activity> = stream::iter(activity_ids)
            .map(|id| async move {
                let activity = db.get_activity(&id).await?;
                Ok::<_, AppError>(activity.map(|a| (id, a)))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<(String, Activity)>>>>()
            .await
            .into_iter()
            .filter_map(|r| r.transpose())
            .collect::<Result<_>>()?;

        let summarize = |ids: &[String]| -> Vec<UserSummary> {
            ids.iter().filter_map(|id| users.get(id).cloned()).collect()
        };

        Ok(TripDetails {
            participants: summarize(&trip.participants),
            activities: trip
                .activities
                .iter()
                .map(|a| TripActivityDetails {
                    activity_id: a.activity_id.clone(),
                    activity: activities.get(&a.activity_id).cloned(),
                    participants: summarize(&a.participants),
                })
                .collect(),
            id: trip.id,
            title: trip.title,
            description: trip.description,
            city: trip.city,
            start_date: trip.start_date,
            end_date: trip.end_date,
            is_exact: trip.is_exact,
            status: trip.status,
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore};
    use crate::models::{AuthProvider, KeyedList};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("{}_name", id),
            email: format!("{}@example.com", id),
            password_hash: None,
            provider: AuthProvider::Local,
            google_id: None,
            trips: Vec::new(),
            activities: KeyedList::new(),
            budgets: KeyedList::new(),
            created_at: now_rfc3339(),
        }
    }

    fn activity(id: &str) -> Activity {
        Activity {
            id: id.to_string(),
            title: "Bouchon dinner".to_string(),
            description: "Traditional Lyonnais food".to_string(),
            location: "Vieux Lyon".to_string(),
            city: City::Lyon,
            price: 45.0,
            image_url: "https://example.com/bouchon.jpg".to_string(),
            tags: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn new_trip(participants: &[&str]) -> NewTrip {
        NewTrip {
            title: "Lyon weekend".to_string(),
            description: "Food and museums".to_string(),
            city: City::Lyon,
            start_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            is_exact: true,
            status: TripStatus::Planning,
            participants: participants.iter().map(|p| p.to_string()).collect(),
        }
    }

    async fn setup(users: &[&str]) -> (MembershipService, Db, MemoryStore) {
        let store = MemoryStore::new();
        let db = Db::with_memory(store.clone());
        for id in users {
            db.create_user(&user(id)).await.unwrap();
        }
        db.upsert_activity(&activity("a1")).await.unwrap();
        db.upsert_activity(&activity("a2")).await.unwrap();
        (MembershipService::new(db.clone()), db, store)
    }

    async fn load_user(db: &Db, id: &str) -> User {
        db.get_user(id).await.unwrap().unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_trip_links_every_participant() {
        let (service, db, _) = setup(&["u1", "u2"]).await;

        let trip = service
            .create_trip("u1", new_trip(&["u2", "u1", "u2"]))
            .await
            .unwrap();

        assert_eq!(trip.participants, ids(&["u2", "u1"]));
        assert!(load_user(&db, "u1").await.has_trip(&trip.id));
        assert!(load_user(&db, "u2").await.has_trip(&trip.id));
    }

    #[tokio::test]
    async fn test_create_trip_requires_creator_in_participants() {
        let (service, db, _) = setup(&["u1", "u2", "u3"]).await;

        let err = service
            .create_trip("u3", new_trip(&["u1", "u2"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        for id in ["u1", "u2", "u3"] {
            assert!(load_user(&db, id).await.trips.is_empty());
        }
    }

    #[tokio::test]
    async fn test_create_trip_rejects_unknown_participant() {
        let (service, db, _) = setup(&["u1"]).await;

        let err = service
            .create_trip("u1", new_trip(&["u1", "ghost"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(load_user(&db, "u1").await.trips.is_empty());
    }

    #[tokio::test]
    async fn test_create_trip_validation() {
        let (service, _, _) = setup(&["u1"]).await;

        let err = service.create_trip("u1", new_trip(&[])).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut backwards = new_trip(&["u1"]);
        backwards.end_date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let err = service.create_trip("u1", backwards).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut short = new_trip(&["u1"]);
        short.title = "Ly".to_string();
        let err = service.create_trip("u1", short).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_gate_checks_existence_before_membership() {
        let (service, _, _) = setup(&["u1", "u2", "u3"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();

        let err = service.get_trip("u3", "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service.get_trip("u3", &trip.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service
            .add_participant("u3", &trip.id, "u3")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_add_participant_twice_conflicts() {
        let (service, db, _) = setup(&["u1", "u2"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1"])).await.unwrap();

        let updated = service.add_participant("u1", &trip.id, "u2").await.unwrap();
        assert_eq!(updated.participants, ids(&["u1", "u2"]));
        assert!(load_user(&db, "u2").await.has_trip(&trip.id));

        let err = service
            .add_participant("u1", &trip.id, "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let trip = db.get_trip(&trip.id).await.unwrap().unwrap();
        assert_eq!(trip.participants, ids(&["u1", "u2"]));
        assert_eq!(load_user(&db, "u2").await.trips, vec![trip.id.clone()]);
    }

    #[tokio::test]
    async fn test_remove_participant_cascades_to_activities() {
        let (service, db, _) = setup(&["u1", "u2"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();
        service
            .add_activity("u1", &trip.id, "a1", &ids(&["u1", "u2"]))
            .await
            .unwrap();

        let updated = service
            .remove_participant("u1", &trip.id, "u2")
            .await
            .unwrap();

        assert_eq!(updated.participants, ids(&["u1"]));
        assert_eq!(updated.activity_participants("a1"), Some(&ids(&["u1"])[..]));

        let u2 = load_user(&db, "u2").await;
        assert!(!u2.has_trip(&trip.id));
        assert!(u2.activity_ids_for(&trip.id).is_empty());
    }

    #[tokio::test]
    async fn test_remove_last_participant_rejected() {
        let (service, _, _) = setup(&["u1"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1"])).await.unwrap();

        let err = service
            .remove_participant("u1", &trip.id, "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .remove_participant("u1", &trip.id, "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_activity_mirrors_assignees_only() {
        let (service, db, _) = setup(&["u1", "u2"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();

        let updated = service
            .add_activity("u2", &trip.id, "a1", &ids(&["u1"]))
            .await
            .unwrap();

        assert_eq!(updated.activity_participants("a1"), Some(&ids(&["u1"])[..]));
        assert_eq!(load_user(&db, "u1").await.activity_ids_for(&trip.id), ids(&["a1"]));
        assert!(load_user(&db, "u2").await.activity_ids_for(&trip.id).is_empty());
    }

    #[tokio::test]
    async fn test_add_activity_checks() {
        let (service, db, _) = setup(&["u1", "u2", "u3"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();

        let err = service
            .add_activity("u1", &trip.id, "a1", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .add_activity("u1", &trip.id, "a1", &ids(&["u3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .add_activity("u1", &trip.id, "nope", &ids(&["u1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        service
            .add_activity("u1", &trip.id, "a1", &ids(&["u1"]))
            .await
            .unwrap();
        let err = service
            .add_activity("u1", &trip.id, "a1", &ids(&["u2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let trip = db.get_trip(&trip.id).await.unwrap().unwrap();
        assert_eq!(trip.activities.len(), 1);
        assert!(load_user(&db, "u2").await.activity_ids_for(&trip.id).is_empty());
    }

    #[tokio::test]
    async fn test_remove_activity_clears_only_actor_mirror() {
        let (service, db, _) = setup(&["u1", "u2"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();
        service
            .add_activity("u1", &trip.id, "a1", &ids(&["u1", "u2"]))
            .await
            .unwrap();

        let updated = service.remove_activity("u1", &trip.id, "a1").await.unwrap();

        assert!(updated.activities.is_empty());
        assert!(load_user(&db, "u1").await.activity_ids_for(&trip.id).is_empty());
        assert_eq!(load_user(&db, "u2").await.activity_ids_for(&trip.id), ids(&["a1"]));

        let err = service
            .remove_activity("u1", &trip.id, "a1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_activity_participant_assignment() {
        let (service, db, _) = setup(&["u1", "u2", "u3"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();
        service
            .add_activity("u1", &trip.id, "a1", &ids(&["u1"]))
            .await
            .unwrap();

        let updated = service
            .add_activity_participant("u1", &trip.id, "a1", "u2")
            .await
            .unwrap();
        assert_eq!(
            updated.activity_participants("a1"),
            Some(&ids(&["u1", "u2"])[..])
        );
        assert_eq!(load_user(&db, "u2").await.activity_ids_for(&trip.id), ids(&["a1"]));

        let err = service
            .add_activity_participant("u1", &trip.id, "a1", "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = service
            .add_activity_participant("u1", &trip.id, "a1", "u3")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .add_activity_participant("u1", &trip.id, "a2", "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let updated = service
            .remove_activity_participant("u1", &trip.id, "a1", "u2")
            .await
            .unwrap();
        assert_eq!(updated.activity_participants("a1"), Some(&ids(&["u1"])[..]));
        assert!(load_user(&db, "u2").await.activity_ids_for(&trip.id).is_empty());

        let err = service
            .remove_activity_participant("u1", &trip.id, "a1", "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Emptying the assignee list keeps the activity planned
        let updated = service
            .remove_activity_participant("u1", &trip.id, "a1", "u1")
            .await
            .unwrap();
        assert_eq!(updated.activity_participants("a1"), Some(&[][..]));
        let u1 = load_user(&db, "u1").await;
        assert!(u1.activity_ids_for(&trip.id).is_empty());
        assert!(u1.activities.is_empty());
    }

    #[tokio::test]
    async fn test_update_trip_patches_scalars() {
        let (service, _, _) = setup(&["u1"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1"])).await.unwrap();

        let patch = TripUpdate {
            title: Some("Lyon long weekend".to_string()),
            status: Some(TripStatus::Upcoming),
            ..Default::default()
        };
        let updated = service.update_trip("u1", &trip.id, patch).await.unwrap();
        assert_eq!(updated.title, "Lyon long weekend");
        assert_eq!(updated.status, TripStatus::Upcoming);
        assert_eq!(updated.participants, trip.participants);

        let patch = TripUpdate {
            end_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            ..Default::default()
        };
        let err = service.update_trip("u1", &trip.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_trip_detaches_everyone() {
        let (service, db, _) = setup(&["u1", "u2"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();
        service
            .add_activity("u1", &trip.id, "a1", &ids(&["u2"]))
            .await
            .unwrap();
        db.update_user("u2", |u| {
            u.set_budget(&trip.id, 300.0);
            Ok(())
        })
        .await
        .unwrap();

        service.delete_trip("u2", &trip.id).await.unwrap();

        assert!(db.get_trip(&trip.id).await.unwrap().is_none());
        for id in ["u1", "u2"] {
            let u = load_user(&db, id).await;
            assert!(!u.has_trip(&trip.id));
            assert!(u.activities.is_empty());
            assert!(u.budgets.is_empty());
        }
    }

    #[tokio::test]
    async fn test_delete_trip_partial_failure_keeps_trip() {
        let (service, db, store) = setup(&["u1", "u2", "u3"]).await;
        let trip = service
            .create_trip("u1", new_trip(&["u1", "u2", "u3"]))
            .await
            .unwrap();
        store.fail_writes_to(collections::USERS, "u2");

        let err = service.delete_trip("u1", &trip.id).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert!(db.get_trip(&trip.id).await.unwrap().is_some());
        assert!(!load_user(&db, "u1").await.has_trip(&trip.id));
        assert!(load_user(&db, "u2").await.has_trip(&trip.id));
        assert!(load_user(&db, "u3").await.has_trip(&trip.id));
    }

    #[tokio::test]
    async fn test_list_trips_filters_and_skips_dangling() {
        let (service, db, _) = setup(&["u1"]).await;
        let first = service.create_trip("u1", new_trip(&["u1"])).await.unwrap();
        let second = service.create_trip("u1", new_trip(&["u1"])).await.unwrap();
        service
            .update_trip(
                "u1",
                &second.id,
                TripUpdate {
                    status: Some(TripStatus::Archived),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        db.update_user("u1", |u| {
            u.add_trip("dangling");
            Ok(())
        })
        .await
        .unwrap();

        let all = service.list_trips("u1", None).await.unwrap();
        let listed: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(listed, vec![first.id.as_str(), second.id.as_str()]);

        let archived = service
            .list_trips("u1", Some(TripStatus::Archived))
            .await
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, second.id);
    }

    #[tokio::test]
    async fn test_details_resolves_references() {
        let (service, _, _) = setup(&["u1", "u2"]).await;
        let trip = service.create_trip("u1", new_trip(&["u1", "u2"])).await.unwrap();
        let trip = service
            .add_activity("u1", &trip.id, "a1", &ids(&["u2"]))
            .await
            .unwrap();

        let details = service.details(trip).await.unwrap();

        let names: Vec<&str> = details
            .participants
            .iter()
            .map(|p| p.username.as_str())
            .collect();
        assert_eq!(names, vec!["u1_name", "u2_name"]);
        assert_eq!(details.activities.len(), 1);
        assert_eq!(
            details.activities[0].activity.as_ref().map(|a| a.id.as_str()),
            Some("a1")
        );
        assert_eq!(details.activities[0].participants[0].id, "u2");
    }
}
