//! Account registration, password hashing, and session tokens
//!
//! Passwords are hashed with Argon2id. Sessions are HS256 JWTs whose `sub`
//! is the user id; they expire after one hour.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::User;

/// Environment variable holding the token signing secret
pub const JWT_SECRET_ENV: &str = "DOCSIGHT_JWT_SECRET";

/// Session lifetime in seconds
pub const TOKEN_TTL_SECS: i64 = 3600;

const MIN_PASSWORD_LEN: usize = 6;

/// Claims carried in a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed session token plus the user it was issued to
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Encryption(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn issue_token(user: &User, secret: &str) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Encryption(format!("Failed to sign token: {}", e)))
}

/// Verify signature and expiry
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| Error::Unauthorized(format!("Invalid token: {}", e)))
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidData("A valid email is required".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidData(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Create an account and sign the caller in
pub fn register(db: &Database, email: &str, password: &str, secret: &str) -> Result<Session> {
    validate_credentials(email, password)?;

    let hash = hash_password(password)?;
    let id = db.create_user(email, &hash, "user")?;
    let user = db
        .get_user(id)?
        .ok_or_else(|| Error::NotFound(format!("User {}", id)))?;

    info!(user_id = id, "User registered");
    Ok(Session {
        token: issue_token(&user, secret)?,
        user,
    })
}

/// Check credentials and issue a session
///
/// Unknown email and wrong password produce the same error.
pub fn login(db: &Database, email: &str, password: &str, secret: &str) -> Result<Session> {
    let invalid = || Error::Unauthorized("Invalid credentials".into());

    let user = db.get_user_by_email(email)?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash) {
        warn!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }

    Ok(Session {
        token: issue_token(&user, secret)?,
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn test_register_and_login() {
        let db = Database::in_memory().unwrap();
        let session = register(&db, "owner@shop.test", "secret1", SECRET).unwrap();
        assert_eq!(session.user.email, "owner@shop.test");

        let claims = verify_token(&session.token, SECRET).unwrap();
        assert_eq!(claims.sub, session.user.id.to_string());
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);

        let again = login(&db, "OWNER@shop.test", "secret1", SECRET).unwrap();
        assert_eq!(again.user.id, session.user.id);
    }

    #[test]
    fn test_login_failures_are_uniform() {
        let db = Database::in_memory().unwrap();
        register(&db, "owner@shop.test", "secret1", SECRET).unwrap();

        let wrong_pw = login(&db, "owner@shop.test", "nope123", SECRET).unwrap_err();
        let unknown = login(&db, "ghost@shop.test", "secret1", SECRET).unwrap_err();
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert!(matches!(wrong_pw, Error::Unauthorized(_)));
    }

    #[test]
    fn test_register_validation() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            register(&db, "no-at-sign", "secret1", SECRET),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            register(&db, "a@b.c", "123", SECRET),
            Err(Error::InvalidData(_))
        ));

        register(&db, "a@b.c", "secret1", SECRET).unwrap();
        assert!(matches!(
            register(&db, "a@b.c", "secret1", SECRET),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let db = Database::in_memory().unwrap();
        let session = register(&db, "a@b.c", "secret1", SECRET).unwrap();
        assert!(matches!(
            verify_token(&session.token, "other-secret"),
            Err(Error::Unauthorized(_))
        ));
        assert!(verify_token("garbage", SECRET).is_err());
    }
}
