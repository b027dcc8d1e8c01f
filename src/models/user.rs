// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::keyed::{Keyed, KeyedList, Upsert};

/// How the account authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Local,
    Google,
}

/// Activities a user is assigned to within one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TripActivityIds {
    pub trip_id: String,
    #[serde(default)]
    pub activity_ids: Vec<String>,
}

impl Keyed for TripActivityIds {
    fn key(&self) -> &str {
        &self.trip_id
    }
}

/// A user's private budget for one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub trip_id: String,
    pub amount: f64,
}

impl Keyed for Budget {
    fn key(&self) -> &str {
        &self.trip_id
    }
}

/// User document stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document ID
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    /// Always stored lowercase
    pub email: String,
    /// Argon2 PHC string; absent for OAuth-provisioned accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub provider: AuthProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Trip IDs, in join order
    #[serde(default)]
    pub trips: Vec<String>,
    #[serde(default)]
    pub activities: KeyedList<TripActivityIds>,
    #[serde(default)]
    pub budgets: KeyedList<Budget>,
    #[serde(default)]
    pub created_at: String,
}

impl User {
    pub fn has_trip(&self, trip_id: &str) -> bool {
        self.trips.iter().any(|t| t == trip_id)
    }

    /// Returns `false` if the trip was already listed.
    pub fn add_trip(&mut self, trip_id: &str) -> bool {
        if self.has_trip(trip_id) {
            return false;
        }
        self.trips.push(trip_id.to_string());
        true
    }

    pub fn remove_trip(&mut self, trip_id: &str) -> bool {
        let before = self.trips.len();
        self.trips.retain(|t| t != trip_id);
        self.trips.len() != before
    }

    /// Record an activity assignment under `trip_id`, creating the trip
    /// entry on first use.
    pub fn add_trip_activity(&mut self, trip_id: &str, activity_id: &str) -> Upsert {
        self.activities.upsert_with(
            trip_id,
            || TripActivityIds {
                trip_id: trip_id.to_string(),
                activity_ids: vec![activity_id.to_string()],
            },
            |entry| {
                if !entry.activity_ids.iter().any(|a| a == activity_id) {
                    entry.activity_ids.push(activity_id.to_string());
                }
            },
        )
    }

    /// Drop an activity assignment. An emptied trip entry is removed.
    pub fn remove_trip_activity(&mut self, trip_id: &str, activity_id: &str) -> bool {
        let Some(entry) = self.activities.get_mut(trip_id) else {
            return false;
        };
        let before = entry.activity_ids.len();
        entry.activity_ids.retain(|a| a != activity_id);
        let removed = entry.activity_ids.len() != before;
        if entry.activity_ids.is_empty() {
            self.activities.remove(trip_id);
        }
        removed
    }

    pub fn drop_trip_activities(&mut self, trip_id: &str) -> bool {
        self.activities.remove(trip_id).is_some()
    }

    pub fn activity_ids_for(&self, trip_id: &str) -> &[String] {
        self.activities
            .get(trip_id)
            .map(|e| e.activity_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_budget(&mut self, trip_id: &str, amount: f64) -> Upsert {
        self.budgets.upsert_with(
            trip_id,
            || Budget {
                trip_id: trip_id.to_string(),
                amount,
            },
            |budget| budget.amount = amount,
        )
    }

    pub fn remove_budget(&mut self, trip_id: &str) -> bool {
        self.budgets.remove(trip_id).is_some()
    }

    /// Detach every trace of `trip_id` from this user.
    pub fn forget_trip(&mut self, trip_id: &str) {
        self.remove_trip(trip_id);
        self.drop_trip_activities(trip_id);
        self.remove_budget(trip_id);
    }
}

/// Public view of another user (trip participant lists).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// User as returned by the API, without credentials or provider IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub provider: AuthProvider,
    pub trips: Vec<String>,
    pub activities: Vec<TripActivityIds>,
    pub budgets: Vec<Budget>,
    pub created_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            provider: user.provider,
            trips: user.trips,
            activities: user.activities.into_vec(),
            budgets: user.budgets.into_vec(),
            created_at: user.created_at,
        }
    }
}
