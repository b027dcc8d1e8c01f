// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog activity model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::City;

/// Fixed tag vocabulary for catalog activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityTag {
    Free,
    Food,
    Music,
    Art,
    Event,
    Views,
    Landmark,
}

/// Activity document stored in the `activities` collection.
///
/// Created by seeding; never written by trip operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Document ID
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: City,
    pub price: f64,
    pub image_url: String,
    #[serde(default)]
    pub tags: Vec<ActivityTag>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}
