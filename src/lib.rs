// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ranger Tracker: field operations backend for protected-area rangers.
//!
//! This crate provides the REST API for planning and logging ranger field
//! activities (with GPS tracks), reporting findings and incidents, and
//! administering personnel, protected areas and equipment.

#[macro_use]
pub mod models;

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{AreaFilter, Db};
use models::ProtectedArea;
use services::{ActivityFeed, ActivityService, AuthProviderClient, ListCache};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub auth_provider: AuthProviderClient,
    pub activity_feed: Arc<ActivityFeed>,
    pub activities: ActivityService,
    pub area_cache: ListCache<AreaFilter, ProtectedArea>,
}

impl AppState {
    pub fn new(config: Config, db: Db, auth_provider: AuthProviderClient) -> Self {
        let activity_feed = Arc::new(ActivityFeed::new());
        let activities = ActivityService::new(db.clone(), activity_feed.clone());
        let area_cache = ListCache::new(config.area_cache_ttl);
        Self {
            config,
            db,
            auth_provider,
            activity_feed,
            activities,
            area_cache,
        }
    }
}
