// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only activity catalog and startup seeding.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{Activity, City};
use crate::time_utils::now_rfc3339;
use std::fs;
use std::path::Path;

#[derive(Clone)]
pub struct CatalogService {
    db: Db,
}

impl CatalogService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_by_city(&self, city: City) -> Result<Vec<Activity>> {
        self.db.get_activities_by_city(city).await
    }

    pub async fn get(&self, activity_id: &str) -> Result<Activity> {
        self.db
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))
    }

    /// Upsert every activity in a JSON array file. Returns the count written.
    pub async fn seed_from_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let json_data = fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        self.seed_from_json(&json_data).await
    }

    pub async fn seed_from_json(&self, json_data: &str) -> Result<usize> {
        let activities: Vec<Activity> = serde_json::from_str(json_data).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Invalid activity seed data: {}", e))
        })?;

        let now = now_rfc3339();
        for mut activity in activities.iter().cloned() {
            if activity.created_at.is_empty() {
                activity.created_at = now.clone();
            }
            activity.updated_at = now.clone();
            self.db.upsert_activity(&activity).await?;
        }

        tracing::info!(count = activities.len(), "Seeded activity catalog");
        Ok(activities.len())
    }
}
