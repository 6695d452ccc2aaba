//! Password hashing and session tokens.
//!
//! Passwords are hashed with an iterated, salted SHA-256. Sessions are HS256
//! JWTs signed with the shared secret from the settings.

use crate::{
    core::status::Role,
    entities::user,
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const HASH_ROUNDS: u32 = 10_000;

/// Generates a fresh random salt.
#[must_use]
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hashes `password` with `salt`, returning lowercase hex.
#[must_use]
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(digest);
        digest = hasher.finalize();
    }

    format!("{digest:x}")
}

/// Checks `password` against a stored hash without short-circuiting on the first mismatch.
#[must_use]
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let computed = hash_password(password, salt);
    if computed.len() != expected_hash.len() {
        return false;
    }
    computed
        .bytes()
        .zip(expected_hash.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Claims carried by a session JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// User role
    pub rol: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

impl Claims {
    /// User id from `sub`.
    pub fn user_id(&self) -> Result<i64> {
        self.sub.parse().map_err(|_| Error::Unauthorized {
            message: "Invalid token subject".to_string(),
        })
    }
}

/// Issues a session token for `user` valid for `ttl_hours`.
pub fn issue_jwt(user: &user::Model, secret: &str, ttl_hours: i64) -> Result<String> {
    let now = Utc::now();
    let expires_at = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config {
            message: format!("Session lifetime out of range: {ttl_hours} hours"),
        })?;
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        rol: user.rol.parse()?,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(Into::into)
}

/// Validates signature and expiry of a session token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected session token: {e}");
        Error::Unauthorized {
            message: "Invalid or expired token".to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sample_user() -> user::Model {
        let now = Utc::now().naive_utc();
        user::Model {
            id: 7,
            nombre: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            password_salt: String::new(),
            rol: "operador".to_string(),
            activo: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        let a = hash_password("hunter22", "salt-a");
        assert_eq!(a, hash_password("hunter22", "salt-a"));
        assert_ne!(a, hash_password("hunter22", "salt-b"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let hash = hash_password("correct horse", &salt);
        assert!(verify_password("correct horse", &salt, &hash));
        assert!(!verify_password("wrong horse", &salt, &hash));
        assert!(!verify_password("correct horse", &salt, "short"));
    }

    #[test]
    fn test_jwt_round_trip() {
        let token = issue_jwt(&sample_user(), "secret", 1).unwrap();
        let claims = decode_jwt(&token, "secret").unwrap();
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.rol, Role::Operador);
        assert_eq!(claims.email, "ana@example.com");
    }

    #[test]
    fn test_jwt_wrong_secret_rejected() {
        let token = issue_jwt(&sample_user(), "secret", 1).unwrap();
        let err = decode_jwt(&token, "other").unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[test]
    fn test_jwt_expired_rejected() {
        let token = issue_jwt(&sample_user(), "secret", -2).unwrap();
        assert!(decode_jwt(&token, "secret").is_err());
    }

    #[test]
    fn test_jwt_ttl_out_of_range_is_config_error() {
        let err = issue_jwt(&sample_user(), "secret", 9_000_000_000_000_000).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
