// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip Planner: collaborative trip planning backend
//!
//! This crate provides the REST API for planning trips with other users:
//! shared participant lists, activities picked from a per-city catalog,
//! and private per-trip budgets.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use services::{AccountService, BudgetService, CatalogService, GoogleOAuth, MembershipService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub membership: MembershipService,
    pub budgets: BudgetService,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    /// `None` when Google sign-in is not configured
    pub google_oauth: Option<GoogleOAuth>,
}

impl AppState {
    /// Wire every service to one store handle.
    pub fn new(config: Config, db: Db) -> Result<Self, error::AppError> {
        let google_oauth = config
            .google
            .clone()
            .map(|google| GoogleOAuth::new(google, config.oauth_state_key.clone()))
            .transpose()?;

        Ok(Self {
            membership: MembershipService::new(db.clone()),
            budgets: BudgetService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            accounts: AccountService::new(db.clone()),
            google_oauth,
            config,
            db,
        })
    }
}
