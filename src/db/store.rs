// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store handle with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts, trip membership mirrors, budgets)
//! - Trips (membership lists and activity assignments)
//! - Activities (read-only catalog, written only by seeding)
//!
//! Every method touches a single document. Operations spanning several
//! documents are sequenced by the services layer.

use crate::db::collections;
use crate::db::firestore as fs;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{Activity, City, Trip, User};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Clone)]
enum Backend {
    Firestore(::firestore::FirestoreDb),
    Memory(MemoryStore),
    Offline,
}

/// Document store client, cheap to clone.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

impl Db {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        let client = fs::connect(project_id).await?;
        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::with_memory(MemoryStore::new())
    }

    pub fn with_memory(store: MemoryStore) -> Self {
        Self {
            backend: Backend::Memory(store),
        }
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── Document Primitives ─────────────────────────────────────

    async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => fs::get(client, collection, id).await,
            Backend::Memory(store) => store.get(collection, id).await,
            Backend::Offline => Err(Self::offline()),
        }
    }

    async fn find_by_field<T>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => fs::find_by_field(client, collection, field, value).await,
            Backend::Memory(store) => store.find_by_field(collection, field, value).await,
            Backend::Offline => Err(Self::offline()),
        }
    }

    async fn insert<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => fs::insert(client, collection, id, doc).await,
            Backend::Memory(store) => store.insert(collection, id, doc).await,
            Backend::Offline => Err(Self::offline()),
        }
    }

    async fn set<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => fs::set(client, collection, id, doc).await,
            Backend::Memory(store) => store.set(collection, id, doc).await,
            Backend::Offline => Err(Self::offline()),
        }
    }

    async fn update<T, F>(&self, collection: &str, id: &str, mutate: F) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce(&mut T) -> Result<(), AppError>,
    {
        match &self.backend {
            Backend::Firestore(client) => fs::update(client, collection, id, mutate).await,
            Backend::Memory(store) => store.update(collection, id, mutate).await,
            Backend::Offline => Err(Self::offline()),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => fs::delete(client, collection, id).await,
            Backend::Memory(store) => store.delete(collection, id).await,
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, user_id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .find_by_field(collections::USERS, "email", &email.to_lowercase())
            .await?;
        Ok(users.into_iter().next())
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .find_by_field(collections::USERS, "username", username)
            .await?;
        Ok(users.into_iter().next())
    }

    pub async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .find_by_field(collections::USERS, "googleId", google_id)
            .await?;
        Ok(users.into_iter().next())
    }

    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.insert(collections::USERS, &user.id, user).await
    }

    /// Atomically modify one user document. `Ok(None)` if it does not exist.
    pub async fn update_user<F>(&self, user_id: &str, mutate: F) -> Result<Option<User>, AppError>
    where
        F: FnOnce(&mut User) -> Result<(), AppError>,
    {
        self.update(collections::USERS, user_id, mutate).await
    }

    // ─── Trip Operations ─────────────────────────────────────────

    pub async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>, AppError> {
        self.get(collections::TRIPS, trip_id).await
    }

    pub async fn create_trip(&self, trip: &Trip) -> Result<(), AppError> {
        self.insert(collections::TRIPS, &trip.id, trip).await
    }

    /// Atomically modify one trip document. `Ok(None)` if it does not exist.
    pub async fn update_trip<F>(&self, trip_id: &str, mutate: F) -> Result<Option<Trip>, AppError>
    where
        F: FnOnce(&mut Trip) -> Result<(), AppError>,
    {
        self.update(collections::TRIPS, trip_id, mutate).await
    }

    pub async fn delete_trip(&self, trip_id: &str) -> Result<(), AppError> {
        self.delete(collections::TRIPS, trip_id).await
    }

    // ─── Activity Catalog Operations ─────────────────────────────

    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get(collections::ACTIVITIES, activity_id).await
    }

    pub async fn get_activities_by_city(&self, city: City) -> Result<Vec<Activity>, AppError> {
        self.find_by_field(collections::ACTIVITIES, "city", city.as_str())
            .await
    }

    /// Create or replace a catalog entry (seeding only).
    pub async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.set(collections::ACTIVITIES, &activity.id, activity)
            .await
    }
}
