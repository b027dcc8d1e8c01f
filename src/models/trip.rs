// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip model: membership lists and nested activity assignments.
//!
//! An activity stays on the trip when its last assignee leaves, either by
//! unassigning or by leaving the trip. Only `remove_activity` takes it off.
//! The user-side mirror is different: an emptied `activities[tripId]`
//! entry on a user is dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::keyed::{Keyed, KeyedList};
use crate::models::{Activity, UserSummary};

/// Cities with a curated activity catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum City {
    Nyc,
    Atlanta,
    Lyon,
}

impl City {
    pub fn as_str(&self) -> &'static str {
        match self {
            City::Nyc => "nyc",
            City::Atlanta => "atlanta",
            City::Lyon => "lyon",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for City {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nyc" => Ok(City::Nyc),
            "atlanta" => Ok(City::Atlanta),
            "lyon" => Ok(City::Lyon),
            other => Err(format!("Unknown city: {other}")),
        }
    }
}

/// Lifecycle label used for filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Planning,
    Upcoming,
    Ongoing,
    Archived,
}

/// One catalog activity planned within a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripActivity {
    pub activity_id: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Keyed for TripActivity {
    fn key(&self) -> &str {
        &self.activity_id
    }
}

/// Trip document stored in the `trips` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Document ID
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub city: City,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Whether the dates are fixed or only approximate
    #[serde(default)]
    pub is_exact: bool,
    #[serde(default)]
    pub status: TripStatus,
    /// User IDs, in join order
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub activities: KeyedList<TripActivity>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Trip {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Returns `false` if the user is already a participant.
    pub fn add_participant(&mut self, user_id: &str) -> bool {
        if self.is_participant(user_id) {
            return false;
        }
        self.participants.push(user_id.to_string());
        true
    }

    /// Remove a participant from the trip and from every activity
    /// assignment. Returns `false` if the user was not a participant.
    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        if !self.is_participant(user_id) {
            return false;
        }
        self.participants.retain(|p| p != user_id);
        for activity in self.activities.iter_mut() {
            activity.participants.retain(|p| p != user_id);
        }
        true
    }

    /// Returns `false` if the activity is already on the trip.
    pub fn add_activity(&mut self, activity_id: &str, participants: Vec<String>) -> bool {
        self.activities.insert(TripActivity {
            activity_id: activity_id.to_string(),
            participants,
        })
    }

    pub fn remove_activity(&mut self, activity_id: &str) -> Option<TripActivity> {
        self.activities.remove(activity_id)
    }

    pub fn activity_participants(&self, activity_id: &str) -> Option<&[String]> {
        self.activities
            .get(activity_id)
            .map(|a| a.participants.as_slice())
    }
}

/// A trip activity with its catalog entry and participants resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TripActivityDetails {
    pub activity_id: String,
    /// `None` when the catalog entry no longer exists
    pub activity: Option<Activity>,
    pub participants: Vec<UserSummary>,
}

/// Trip as returned by the API, with references resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub city: City,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_date: NaiveDate,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_date: NaiveDate,
    pub is_exact: bool,
    pub status: TripStatus,
    pub participants: Vec<UserSummary>,
    pub activities: Vec<TripActivityDetails>,
    pub created_at: String,
    pub updated_at: String,
}
