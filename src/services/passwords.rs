// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password-change rules.

use crate::error::AppError;
use crate::models::Role;

pub const MIN_PASSWORD_LEN: usize = 6;
/// Upper bound accepted by the auth provider (bytes).
pub const MAX_PASSWORD_LEN: usize = 72;

/// Who is changing whose password.
#[derive(Debug, Clone, Copy)]
pub struct PasswordParty<'a> {
    pub id: &'a str,
    pub role: Role,
}

/// Decide whether `actor` may set `target`'s password.
///
/// Checked before the password itself so a forbidden pairing is rejected
/// regardless of the submitted value.
pub fn check_password_change(actor: PasswordParty<'_>, target: PasswordParty<'_>) -> Result<(), AppError> {
    if actor.id == target.id {
        return Ok(());
    }
    let allowed = match (actor.role, target.role) {
        (_, Role::Administrator) => false,
        (Role::Administrator, _) => true,
        (Role::Coordinator, Role::Ranger) => true,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "A {} may not change the password of a {}",
            actor.role, target.role
        )))
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(id: &str, role: Role) -> PasswordParty<'_> {
        PasswordParty { id, role }
    }

    #[test]
    fn test_self_change_always_allowed() {
        for role in Role::ALL {
            assert!(check_password_change(party("a", *role), party("a", *role)).is_ok());
        }
    }

    #[test]
    fn test_nobody_changes_another_administrator() {
        for role in Role::ALL {
            let err = check_password_change(party("a", *role), party("b", Role::Administrator))
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
    }

    #[test]
    fn test_role_pairs() {
        let ok = |a: Role, t: Role| check_password_change(party("a", a), party("b", t)).is_ok();
        assert!(ok(Role::Administrator, Role::Coordinator));
        assert!(ok(Role::Administrator, Role::Ranger));
        assert!(ok(Role::Coordinator, Role::Ranger));
        assert!(!ok(Role::Coordinator, Role::Coordinator));
        assert!(!ok(Role::Ranger, Role::Ranger));
        assert!(!ok(Role::Ranger, Role::Coordinator));
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(72)).is_ok());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }
}
