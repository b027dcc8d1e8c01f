// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod access;
pub mod accounts;
pub mod budget;
pub mod catalog;
pub mod google_oauth;
pub mod membership;

pub use accounts::{AccountService, LoginRequest, RegisterRequest};
pub use budget::{BudgetService, SetBudgetRequest};
pub use catalog::CatalogService;
pub use google_oauth::{GoogleOAuth, GoogleProfile};
pub use membership::{MembershipService, NewTrip, TripUpdate};
