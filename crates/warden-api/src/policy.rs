//! Authorization policy. Pure functions over verified claims and user
//! records; the middleware and handlers decide where to apply them.

use warden_types::api::Claims;
use warden_types::{Role, User};

use crate::error::{ApiError, ApiResult};

/// Roles allowed into user management and the web session surface.
pub const STAFF_ROLES: &[Role] = &[Role::Manager, Role::Admin];

pub fn require_role(claims: &Claims, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Insufficient permissions".into()))
    }
}

/// Admins manage everyone, managers only the accounts they created,
/// workers nobody.
pub fn can_manage(actor: &User, target: &User) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Manager => target.created_by == Some(actor.id),
        Role::Worker => false,
    }
}

pub fn creatable_roles(actor: Role) -> &'static [Role] {
    match actor {
        Role::Admin => &[Role::Worker, Role::Manager],
        Role::Manager => &[Role::Worker],
        Role::Worker => &[],
    }
}

pub fn can_create(actor: Role, role: Role) -> bool {
    creatable_roles(actor).contains(&role)
}

/// Creator filter for user listings: admins see all, managers their own.
pub fn user_list_scope(claims: &Claims) -> Option<i64> {
    match claims.role {
        Role::Admin => None,
        _ => Some(claims.sub),
    }
}

/// Sender filter for message-log queries. Workers only ever see their own
/// messages, whatever filter they asked for.
pub fn message_sender_scope(claims: &Claims, requested: Option<i64>) -> Option<i64> {
    match claims.role {
        Role::Worker => Some(claims.sub),
        Role::Manager | Role::Admin => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use warden_types::api::TokenKind;

    fn user(id: i64, role: Role, created_by: Option<i64>) -> User {
        User {
            id,
            username: format!("user{}", id),
            role,
            created_by,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    fn claims(sub: i64, role: Role) -> Claims {
        Claims {
            sub,
            username: format!("user{}", sub),
            role,
            kind: TokenKind::Access,
            iat: 0,
            exp: 0,
            jti: String::new(),
        }
    }

    #[test]
    fn test_can_manage_matrix() {
        let admin = user(1, Role::Admin, None);
        let manager = user(2, Role::Manager, Some(1));
        let other_manager = user(3, Role::Manager, Some(1));
        let own_worker = user(4, Role::Worker, Some(2));
        let foreign_worker = user(5, Role::Worker, Some(3));

        for target in [&admin, &manager, &own_worker, &foreign_worker] {
            assert!(can_manage(&admin, target));
        }

        assert!(can_manage(&manager, &own_worker));
        assert!(!can_manage(&manager, &foreign_worker));
        assert!(!can_manage(&manager, &other_manager));
        assert!(!can_manage(&manager, &manager));
        assert!(!can_manage(&manager, &admin));

        for target in [&admin, &manager, &own_worker, &foreign_worker] {
            assert!(!can_manage(&own_worker, target));
        }
    }

    #[test]
    fn test_creation_allow_list() {
        assert!(can_create(Role::Admin, Role::Manager));
        assert!(can_create(Role::Admin, Role::Worker));
        assert!(!can_create(Role::Admin, Role::Admin));
        assert!(can_create(Role::Manager, Role::Worker));
        assert!(!can_create(Role::Manager, Role::Manager));
        assert!(!can_create(Role::Worker, Role::Worker));
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&claims(1, Role::Admin), STAFF_ROLES).is_ok());
        assert!(require_role(&claims(1, Role::Manager), STAFF_ROLES).is_ok());
        assert!(matches!(
            require_role(&claims(1, Role::Worker), STAFF_ROLES),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_scopes() {
        assert_eq!(user_list_scope(&claims(1, Role::Admin)), None);
        assert_eq!(user_list_scope(&claims(2, Role::Manager)), Some(2));

        assert_eq!(message_sender_scope(&claims(9, Role::Worker), Some(1)), Some(9));
        assert_eq!(message_sender_scope(&claims(9, Role::Worker), None), Some(9));
        assert_eq!(message_sender_scope(&claims(2, Role::Manager), Some(1)), Some(1));
        assert_eq!(message_sender_scope(&claims(1, Role::Admin), None), None);
    }
}
