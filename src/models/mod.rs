// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

/// Declare a closed catalog stored as lowercase text.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` and `TryFrom<String>`
/// (the latter is what `#[sqlx(try_from = "String")]` row mapping uses).
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub mod activity;
pub mod area;
pub mod equipment;
pub mod finding;
pub mod follow_up;
pub mod incident;
pub mod stats;
pub mod user;

pub use activity::{Activity, ActivityCategory, ActivityStatus, Evidence, GeolocationPoint};
pub use area::{AreaBoundary, Department, Ecosystem, ProtectedArea};
pub use equipment::{Equipment, EquipmentStatus};
pub use finding::{Finding, FindingStatus, Severity};
pub use follow_up::FollowUp;
pub use incident::{Incident, IncidentCategory, IncidentStatus};
pub use stats::DashboardStats;
pub use user::{Role, User, UserStatus};

/// A stored or submitted value that is not part of its catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Validate a latitude/longitude pair.
pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_enum_round_trip_through_text() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "Role");
        assert_eq!(err.value, "superuser");
    }

    #[test]
    fn test_serde_uses_catalog_text() {
        let json = serde_json::to_string(&ActivityStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_valid_coordinates() {
        assert!(valid_coordinates(14.6, -90.5));
        assert!(!valid_coordinates(91.0, 0.0));
        assert!(!valid_coordinates(0.0, -181.0));
        assert!(!valid_coordinates(f64::NAN, 0.0));
    }
}
