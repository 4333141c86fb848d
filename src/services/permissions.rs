// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role × module × action permission table.
//!
//! A static lookup with no hierarchy: each role has an explicit row per
//! module. Every protected route consults it through [`require`].

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::Role;
use serde::Serialize;

string_enum! {
    /// Application areas a permission applies to.
    pub enum Module {
        Dashboard => "dashboard",
        Users => "users",
        Rangers => "rangers",
        ProtectedAreas => "protected_areas",
        Equipment => "equipment",
        ActivityPlanning => "activity_planning",
        DailyLog => "daily_log",
        Findings => "findings",
        Incidents => "incidents",
        Routes => "routes",
        Reports => "reports",
        Catalogs => "catalogs",
    }
}

string_enum! {
    pub enum Action {
        View => "view",
        Create => "create",
        Edit => "edit",
        Delete => "delete",
    }
}

/// What a role may do within one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Permissions {
    /// Build from a flag string such as `"VCE"`.
    const fn from_flags(flags: &str) -> Self {
        let bytes = flags.as_bytes();
        let mut p = Permissions {
            can_view: false,
            can_create: false,
            can_edit: false,
            can_delete: false,
        };
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'V' => p.can_view = true,
                b'C' => p.can_create = true,
                b'E' => p.can_edit = true,
                b'D' => p.can_delete = true,
                _ => {}
            }
            i += 1;
        }
        p
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
        }
    }
}

/// Look up the permissions of `role` on `module`.
pub fn permissions_for(role: Role, module: Module) -> Permissions {
    use Module::*;
    let flags = match (role, module) {
        (_, Dashboard) | (_, Routes) => "V",

        (Role::Administrator, DailyLog) | (Role::Administrator, Reports) => "V",
        (Role::Administrator, _) => "VCED",

        (Role::Coordinator, Users) => "",
        (Role::Coordinator, Rangers)
        | (Role::Coordinator, ProtectedAreas)
        | (Role::Coordinator, Findings)
        | (Role::Coordinator, Incidents) => "VCE",
        (Role::Coordinator, Equipment) | (Role::Coordinator, ActivityPlanning) => "VCED",
        (Role::Coordinator, DailyLog)
        | (Role::Coordinator, Reports)
        | (Role::Coordinator, Catalogs) => "V",

        (Role::Ranger, Users) | (Role::Ranger, Rangers) | (Role::Ranger, Reports) => "",
        (Role::Ranger, DailyLog) => "VCE",
        (Role::Ranger, Findings) | (Role::Ranger, Incidents) => "VC",
        (Role::Ranger, ProtectedAreas)
        | (Role::Ranger, Equipment)
        | (Role::Ranger, ActivityPlanning)
        | (Role::Ranger, Catalogs) => "V",
    };
    Permissions::from_flags(flags)
}

/// Every module's permissions for `role`, in declaration order.
pub fn matrix_for(role: Role) -> Vec<(Module, Permissions)> {
    Module::ALL
        .iter()
        .map(|m| (*m, permissions_for(role, *m)))
        .collect()
}

/// Fail with `Forbidden` unless the user's role allows `action` on `module`.
pub fn require(user: &AuthUser, module: Module, action: Action) -> Result<(), AppError> {
    if permissions_for(user.role, module).allows(action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.id,
            role = %user.role,
            module = %module,
            action = %action,
            "Permission denied"
        );
        Err(AppError::Forbidden(format!(
            "Role {} may not {} {}",
            user.role, action, module
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(role: Role, module: Module) -> String {
        let p = permissions_for(role, module);
        [
            (p.can_view, 'V'),
            (p.can_create, 'C'),
            (p.can_edit, 'E'),
            (p.can_delete, 'D'),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, c)| *c)
        .collect()
    }

    #[test]
    fn test_full_matrix() {
        use Module::*;
        let expected: &[(Module, &str, &str, &str)] = &[
            (Dashboard, "V", "V", "V"),
            (Users, "VCED", "", ""),
            (Rangers, "VCED", "VCE", ""),
            (ProtectedAreas, "VCED", "VCE", "V"),
            (Equipment, "VCED", "VCED", "V"),
            (ActivityPlanning, "VCED", "VCED", "V"),
            (DailyLog, "V", "V", "VCE"),
            (Findings, "VCED", "VCE", "VC"),
            (Incidents, "VCED", "VCE", "VC"),
            (Routes, "V", "V", "V"),
            (Reports, "V", "V", ""),
            (Catalogs, "VCED", "V", "V"),
        ];
        assert_eq!(expected.len(), Module::ALL.len());

        for (module, admin, coordinator, ranger) in expected {
            assert_eq!(flags(Role::Administrator, *module), *admin, "admin {}", module);
            assert_eq!(flags(Role::Coordinator, *module), *coordinator, "coord {}", module);
            assert_eq!(flags(Role::Ranger, *module), *ranger, "ranger {}", module);
        }
    }

    #[test]
    fn test_require_denies_ranger_planning() {
        let ranger = AuthUser {
            id: "r1".to_string(),
            role: Role::Ranger,
            area_id: None,
            email: None,
        };
        assert!(require(&ranger, Module::DailyLog, Action::Edit).is_ok());
        let err = require(&ranger, Module::ActivityPlanning, Action::Create).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_permissions_serialize_camel_case() {
        let json = serde_json::to_value(permissions_for(Role::Ranger, Module::Findings)).unwrap();
        assert_eq!(json["canView"], true);
        assert_eq!(json["canCreate"], true);
        assert_eq!(json["canDelete"], false);
    }
}
