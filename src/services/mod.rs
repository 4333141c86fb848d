// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod auth_provider;
pub mod bulk_import;
pub mod cache;
pub mod feed;
pub mod passwords;
pub mod permissions;
pub mod seed;
pub mod track;

pub use activity::{ActivityService, ImportReport};
pub use auth_provider::AuthProviderClient;
pub use cache::ListCache;
pub use feed::{ActivityEvent, ActivityEventKind, ActivityFeed};
pub use permissions::{permissions_for, require, Action, Module, Permissions};
