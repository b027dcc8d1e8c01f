// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user trip budgets.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{Upsert, UserProfile};
use crate::services::access::trip_not_found;
use serde::Deserialize;

/// Body of `POST /api/users/budgets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBudgetRequest {
    pub trip_id: String,
    pub amount: f64,
}

#[derive(Clone)]
pub struct BudgetService {
    db: Db,
}

impl BudgetService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create or overwrite the actor's budget for a trip.
    ///
    /// Only the trip's existence is checked, not membership.
    pub async fn set_budget(&self, actor: &str, request: SetBudgetRequest) -> Result<UserProfile> {
        if !request.amount.is_finite() || request.amount < 0.0 {
            return Err(AppError::BadRequest(
                "Budget amount must be a non-negative number".to_string(),
            ));
        }

        if self.db.get_trip(&request.trip_id).await?.is_none() {
            return Err(trip_not_found(&request.trip_id));
        }

        let mut outcome = Upsert::Updated;
        let user = self
            .db
            .update_user(actor, |user| {
                outcome = user.set_budget(&request.trip_id, request.amount);
                Ok(())
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", actor)))?;

        tracing::info!(
            user_id = actor,
            trip_id = %request.trip_id,
            created = outcome == Upsert::Created,
            "Budget saved"
        );
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthProvider, City, KeyedList, Trip, TripStatus, User};
    use chrono::NaiveDate;

    async fn seeded_db() -> Db {
        let db = Db::in_memory();
        db.create_user(&User {
            id: "u1".to_string(),
            username: "walker".to_string(),
            email: "walker@example.com".to_string(),
            password_hash: None,
            provider: AuthProvider::Local,
            google_id: None,
            trips: Vec::new(),
            activities: KeyedList::new(),
            budgets: KeyedList::new(),
            created_at: String::new(),
        })
        .await
        .unwrap();
        db.create_trip(&Trip {
            id: "t1".to_string(),
            title: "Atlanta trip".to_string(),
            description: "Visiting friends".to_string(),
            city: City::Atlanta,
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
            is_exact: false,
            status: TripStatus::Planning,
            participants: vec!["someone-else".to_string()],
            activities: KeyedList::new(),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .unwrap();
        db
    }

    fn request(trip_id: &str, amount: f64) -> SetBudgetRequest {
        SetBudgetRequest {
            trip_id: trip_id.to_string(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_set_budget_upserts() {
        let service = BudgetService::new(seeded_db().await);

        let profile = service.set_budget("u1", request("t1", 250.0)).await.unwrap();
        assert_eq!(profile.budgets.len(), 1);
        assert_eq!(profile.budgets[0].amount, 250.0);

        let profile = service.set_budget("u1", request("t1", 400.0)).await.unwrap();
        assert_eq!(profile.budgets.len(), 1);
        assert_eq!(profile.budgets[0].amount, 400.0);
    }

    #[tokio::test]
    async fn test_set_budget_rejections() {
        let service = BudgetService::new(seeded_db().await);

        let err = service.set_budget("u1", request("t1", -5.0)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .set_budget("u1", request("t1", f64::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .set_budget("u1", request("missing", 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
