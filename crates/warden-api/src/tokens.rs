//! Token Service: mints and verifies HS256 access/refresh JWT pairs.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use warden_db::Database;
use warden_types::Role;
use warden_types::api::{Claims, TokenKind, TokenPair};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Wrong token type, expected {0:?} token")]
    WrongKind(TokenKind),
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Mint an access/refresh pair carrying the same identity snapshot.
    pub fn issue(&self, user_id: i64, username: &str, role: Role) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.mint(user_id, username, role, TokenKind::Access)?,
            refresh_token: self.mint(user_id, username, role, TokenKind::Refresh)?,
        })
    }

    fn mint(&self, user_id: i64, username: &str, role: Role, kind: TokenKind) -> ApiResult<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            kind,
            iat: now.timestamp().max(0) as u64,
            exp: (now + ttl).timestamp().max(0) as u64,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Check signature, expiry and kind. No I/O.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.kind != expected {
            return Err(TokenError::WrongKind(expected));
        }

        Ok(data.claims)
    }

    /// Exchange a refresh token for a fresh pair. The user is re-read so the
    /// new tokens carry the current username and role, and a deactivated or
    /// deleted account cannot keep refreshing. Blocking: touches the store.
    pub fn refresh(&self, db: &Database, refresh_token: &str) -> ApiResult<TokenPair> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;

        let user = db
            .get_user_by_id(claims.sub)?
            .filter(|user| user.is_active)
            .ok_or_else(|| {
                warn!("Refresh rejected for user {}: not found or inactive", claims.sub);
                ApiError::Unauthorized("User not found or inactive".into())
            })?;

        self.issue(user.id, &user.username, user.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_db::UserUpdate;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-long-enough", Duration::hours(24), Duration::days(30))
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service().issue(7, "ada", Role::Manager).unwrap();

        let claims = service().verify(&tokens.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);

        let refresh = service().verify(&tokens.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 30 * 24 * 3600);
        assert_ne!(claims.jti, refresh.jti);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let tokens = service().issue(1, "x", Role::Worker).unwrap();
        assert_eq!(
            service().verify(&tokens.access_token, TokenKind::Refresh),
            Err(TokenError::WrongKind(TokenKind::Refresh))
        );
        assert_eq!(
            service().verify(&tokens.refresh_token, TokenKind::Access),
            Err(TokenError::WrongKind(TokenKind::Access))
        );
    }

    #[test]
    fn test_expired_token() {
        // Past the default 60s leeway.
        let stale = TokenService::new("test-secret-key-long-enough", Duration::minutes(-5), Duration::minutes(-5));
        let tokens = stale.issue(1, "x", Role::Worker).unwrap();
        assert_eq!(service().verify(&tokens.access_token, TokenKind::Access), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let other = TokenService::new("another-secret-entirely", Duration::hours(1), Duration::hours(1));
        let tokens = other.issue(1, "x", Role::Admin).unwrap();
        assert_eq!(service().verify(&tokens.access_token, TokenKind::Access), Err(TokenError::Invalid));
        assert_eq!(service().verify("invalid.token.here", TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn test_refresh_uses_live_user() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("old-name", "pw", Role::Admin, None).unwrap();
        let tokens = service().issue(id, "old-name", Role::Admin).unwrap();

        db.update_user(id, &UserUpdate { username: Some("new-name".into()), ..Default::default() })
            .unwrap();

        let renewed = service().refresh(&db, &tokens.refresh_token).unwrap();
        let claims = service().verify(&renewed.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.username, "new-name");

        // an access token is not a refresh token
        assert!(matches!(
            service().refresh(&db, &tokens.access_token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_refresh_rejects_inactive_and_missing_users() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("gone", "pw", Role::Admin, None).unwrap();
        let tokens = service().issue(id, "gone", Role::Admin).unwrap();

        db.deactivate_user(id).unwrap();
        assert!(matches!(
            service().refresh(&db, &tokens.refresh_token),
            Err(ApiError::Unauthorized(_))
        ));

        let ghost = service().issue(9999, "ghost", Role::Worker).unwrap();
        assert!(matches!(
            service().refresh(&db, &ghost.refresh_token),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
