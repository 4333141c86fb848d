// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (auth provider keys) are injected as environment variables by the
//! deployment and read once at startup.

use std::env;
use std::time::Duration;

/// Operating region offset from UTC, in hours. The region does not observe DST.
pub const DEFAULT_REGION_UTC_OFFSET_HOURS: i32 = -6;

/// Default lifetime of cached protected-area listings.
pub const DEFAULT_AREA_CACHE_TTL_SECS: u64 = 30;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Database connection URL
    pub database_url: String,
    /// Frontend URL (CORS allow-list)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Base URL of the managed auth provider
    pub auth_provider_url: String,
    /// Maps API key, handed to the frontend untouched
    pub maps_api_key: Option<String>,
    /// Fixed UTC offset used for field timestamps
    pub region_utc_offset_hours: i32,
    /// TTL for the protected-area list cache
    pub area_cache_ttl: Duration,

    // --- Secrets ---
    /// Secret the auth provider signs session tokens with (HS256)
    pub jwt_secret: Vec<u8>,
    /// Service-role key for the auth provider admin API
    pub auth_service_key: String,
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            auth_provider_url: "http://localhost:9999".to_string(),
            maps_api_key: None,
            region_utc_offset_hours: DEFAULT_REGION_UTC_OFFSET_HOURS,
            area_cache_ttl: Duration::from_secs(DEFAULT_AREA_CACHE_TTL_SECS),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            auth_service_key: "test_service_key".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// For local development, values can be placed in a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let region_utc_offset_hours = match env::var("REGION_UTC_OFFSET_HOURS") {
            Ok(raw) => {
                let hours: i32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("REGION_UTC_OFFSET_HOURS", raw.clone()))?;
                if !(-12..=14).contains(&hours) {
                    return Err(ConfigError::Invalid("REGION_UTC_OFFSET_HOURS", raw));
                }
                hours
            }
            Err(_) => DEFAULT_REGION_UTC_OFFSET_HOURS,
        };

        let area_cache_ttl_secs = env::var("AREA_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_AREA_CACHE_TTL_SECS);

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://ranger.db?mode=rwc".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            auth_provider_url: env::var("AUTH_PROVIDER_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("AUTH_PROVIDER_URL"))?,
            maps_api_key: env::var("MAPS_API_KEY").ok().filter(|v| !v.is_empty()),
            region_utc_offset_hours,
            area_cache_ttl: Duration::from_secs(area_cache_ttl_secs),

            jwt_secret: env::var("AUTH_JWT_SECRET")
                .map_err(|_| ConfigError::Missing("AUTH_JWT_SECRET"))?
                .trim()
                .as_bytes()
                .to_vec(),
            auth_service_key: env::var("AUTH_SERVICE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("AUTH_SERVICE_KEY"))?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
