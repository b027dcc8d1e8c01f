// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod keyed;
pub mod trip;
pub mod user;

pub use activity::{Activity, ActivityTag};
pub use keyed::{Keyed, KeyedList, Upsert};
pub use trip::{City, Trip, TripActivity, TripActivityDetails, TripDetails, TripStatus};
pub use user::{AuthProvider, Budget, TripActivityIds, User, UserProfile, UserSummary};
