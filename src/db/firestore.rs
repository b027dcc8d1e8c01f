// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore backend: connection setup and single-document primitives.
//!
//! Every write touches exactly one document. `update` runs its
//! read-modify-write inside a Firestore transaction so the mutation closure
//! sees the committed state of that one document; nothing here spans
//! documents.

use crate::error::AppError;
use firestore::{FirestoreConsistencySelector, FirestoreDb};
use serde::{de::DeserializeOwned, Serialize};

/// Connect to Firestore.
///
/// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
pub async fn connect(project_id: &str) -> Result<FirestoreDb, AppError> {
    // If the emulator environment variable is set, use unauthenticated connection
    // to avoid local credential warnings and leakage.
    if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
        return connect_emulator(project_id).await;
    }

    let client = FirestoreDb::new(project_id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

    tracing::info!(project = project_id, "Connected to Firestore");
    Ok(client)
}

/// Create a Firestore client for the emulator with unauthenticated access.
async fn connect_emulator(project_id: &str) -> Result<FirestoreDb, AppError> {
    tracing::info!("Using unauthenticated connection for Firestore Emulator");

    let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
        Ok(gcloud_sdk::Token {
            token_type: "Bearer".to_string(),
            token: gcloud_sdk::SecretValue::new(
                "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                    .to_string()
                    .into(),
            ),
            expiry: chrono::Utc::now() + chrono::Duration::hours(1),
        })
    });

    let options = firestore::FirestoreDbOptions::new(project_id.to_string());

    let client = FirestoreDb::with_options_token_source(
        options,
        gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
    )
    .await
    .map_err(|e| AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e)))?;

    tracing::info!(
        project = project_id,
        "Connected to Firestore (Emulator/Unauthenticated)"
    );

    Ok(client)
}

pub async fn get<T>(client: &FirestoreDb, collection: &str, id: &str) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned + Send,
{
    client
        .fluent()
        .select()
        .by_id_in(collection)
        .obj()
        .one(id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// All documents whose string `field` equals `value`, ordered by document ID.
pub async fn find_by_field<T>(
    client: &FirestoreDb,
    collection: &str,
    field: &str,
    value: &str,
) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Send,
{
    client
        .fluent()
        .select()
        .from(collection)
        .filter(|q| q.for_all([q.field(field).eq(value)]))
        .obj()
        .query()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Create a document; fails if the ID is already taken.
pub async fn insert<T>(
    client: &FirestoreDb,
    collection: &str,
    id: &str,
    doc: &T,
) -> Result<(), AppError>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let _: T = client
        .fluent()
        .insert()
        .into(collection)
        .document_id(id)
        .object(doc)
        .execute()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Create or replace a document.
pub async fn set<T>(client: &FirestoreDb, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let _: T = client
        .fluent()
        .update()
        .in_col(collection)
        .document_id(id)
        .object(doc)
        .execute()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Atomically read, mutate, and write back one document.
///
/// Returns `Ok(None)` without writing when the document does not exist. An
/// error from `mutate` rolls the transaction back and is returned unchanged.
pub async fn update<T, F>(
    client: &FirestoreDb,
    collection: &str,
    id: &str,
    mutate: F,
) -> Result<Option<T>, AppError>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce(&mut T) -> Result<(), AppError>,
{
    let mut transaction = client
        .begin_transaction()
        .await
        .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

    // Reads through this handle register the document for conflict detection.
    let reader = client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
        transaction.transaction_id().clone(),
    ));

    let current: Option<T> = reader
        .fluent()
        .select()
        .by_id_in(collection)
        .obj()
        .one(id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to read in transaction: {}", e)))?;

    let Some(mut doc) = current else {
        let _ = transaction.rollback().await;
        return Ok(None);
    };

    if let Err(e) = mutate(&mut doc) {
        let _ = transaction.rollback().await;
        return Err(e);
    }

    client
        .fluent()
        .update()
        .in_col(collection)
        .document_id(id)
        .object(&doc)
        .add_to_transaction(&mut transaction)
        .map_err(|e| AppError::Database(format!("Failed to add write to transaction: {}", e)))?;

    transaction
        .commit()
        .await
        .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

    Ok(Some(doc))
}

pub async fn delete(client: &FirestoreDb, collection: &str, id: &str) -> Result<(), AppError> {
    client
        .fluent()
        .delete()
        .from(collection)
        .document_id(id)
        .execute()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}
