use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use storefront_db::{Database, is_unique_violation};
use storefront_types::models::{PublicUser, Role};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};

/// Sessions expire this long after sign-in. There is no sliding renewal.
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: PublicUser,
    pub session_id: String,
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// An unparsable stored hash verifies as false.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 32 random bytes, hex encoded. Unrelated to the user id.
fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

pub fn sign_up(db: &Database, email: &str, password: &str, name: &str) -> ServiceResult<PublicUser> {
    if db.get_user_by_email(email)?.is_some() {
        return Err(ServiceError::DuplicateUser);
    }

    let password_hash = hash_password(password)?;

    // A concurrent signup can still win between the check and the insert;
    // the UNIQUE constraint on email catches it.
    let id = match db.create_user(email, name, &password_hash) {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => return Err(ServiceError::DuplicateUser),
        Err(e) => return Err(e.into()),
    };

    info!("New user {} signed up ({})", id, email);

    let user = db
        .get_user_by_id(id)?
        .ok_or_else(|| anyhow!("User {} missing right after insert", id))?;
    Ok(user.into_public())
}

pub fn sign_in(db: &Database, email: &str, password: &str) -> ServiceResult<SignedIn> {
    let Some(user) = db.get_user_by_email(email)? else {
        return Err(ServiceError::InvalidCredentials);
    };
    if !verify_password(password, &user.password) {
        return Err(ServiceError::InvalidCredentials);
    }

    let session_id = generate_session_id();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
    db.create_session(&session_id, user.id, expires_at)?;

    info!("User {} signed in", user.id);
    Ok(SignedIn {
        user: user.into_public(),
        session_id,
    })
}

/// Deleting an unknown or already removed session is not an error.
pub fn sign_out(db: &Database, session_id: &str) -> ServiceResult<()> {
    if db.delete_session(session_id)? {
        info!("Session signed out");
    }
    Ok(())
}

/// The user owning `session_id`, or `None` when there is no id, no such
/// session, or the session has expired. Expired rows are left in place.
pub fn current_user(db: &Database, session_id: Option<&str>) -> ServiceResult<Option<PublicUser>> {
    current_user_at(db, session_id, Utc::now())
}

fn current_user_at(
    db: &Database,
    session_id: Option<&str>,
    now: DateTime<Utc>,
) -> ServiceResult<Option<PublicUser>> {
    let Some(session_id) = session_id.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Some((session, user)) = db.get_session_with_user(session_id)? else {
        return Ok(None);
    };

    match session.expires_at() {
        Some(expires_at) if expires_at > now => Ok(Some(user.into_public())),
        Some(_) => Ok(None),
        None => {
            warn!("Unreadable expires_at '{}' on a session of user {}", session.expires_at, session.user_id);
            Ok(None)
        }
    }
}

pub fn get_user(db: &Database, id: i64) -> ServiceResult<PublicUser> {
    let user = db.get_user_by_id(id)?.ok_or(ServiceError::NotFound("user"))?;
    Ok(user.into_public())
}

/// Operator bootstrap; not reachable through the API. Returns false when
/// no user has that email.
pub fn promote_to_admin(db: &Database, email: &str) -> ServiceResult<bool> {
    let promoted = db.set_user_role(email, Role::Admin)?;
    if promoted {
        info!("Granted admin role to {}", email);
    }
    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn sign_up_hashes_and_hides_password() {
        let db = test_support::db();
        let user = sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.role, Role::User);

        let row = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_ne!(row.password, "hunter22");
        assert!(verify_password("hunter22", &row.password));
    }

    #[test]
    fn duplicate_email_creates_nothing() {
        let db = test_support::db();
        let first = sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();

        let err = sign_up(&db, "ada@example.com", "other-pass", "Impostor").unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateUser));

        let row = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(row.id, first.id);
        assert_eq!(row.name, "Ada");
        assert!(db.get_user_by_id(first.id + 1).unwrap().is_none());
    }

    #[test]
    fn wrong_password_and_unknown_email_are_indistinguishable() {
        let db = test_support::db();
        sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();

        let wrong = sign_in(&db, "ada@example.com", "nope").unwrap_err();
        let unknown = sign_in(&db, "bob@example.com", "hunter22").unwrap_err();
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn session_lifecycle() {
        let db = test_support::db();
        let user = sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();

        let signed_in = sign_in(&db, "ada@example.com", "hunter22").unwrap();
        assert_eq!(signed_in.user, user);
        assert_eq!(signed_in.session_id.len(), 64);
        assert_ne!(signed_in.session_id, user.id.to_string());

        let current = current_user(&db, Some(&signed_in.session_id)).unwrap();
        assert_eq!(current, Some(user));

        sign_out(&db, &signed_in.session_id).unwrap();
        assert_eq!(current_user(&db, Some(&signed_in.session_id)).unwrap(), None);

        // Idempotent.
        sign_out(&db, &signed_in.session_id).unwrap();
        sign_out(&db, "never-existed").unwrap();
    }

    #[test]
    fn concurrent_sessions_are_independent() {
        let db = test_support::db();
        sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();
        let laptop = sign_in(&db, "ada@example.com", "hunter22").unwrap();
        let phone = sign_in(&db, "ada@example.com", "hunter22").unwrap();
        assert_ne!(laptop.session_id, phone.session_id);

        sign_out(&db, &laptop.session_id).unwrap();
        assert!(current_user(&db, Some(&phone.session_id)).unwrap().is_some());
    }

    #[test]
    fn expired_session_is_rejected_but_kept() {
        let db = test_support::db();
        let user_id = test_support::user(&db, "ada@example.com");
        db.create_session("stale", user_id, Utc::now() - Duration::minutes(1))
            .unwrap();

        assert_eq!(current_user(&db, Some("stale")).unwrap(), None);
        assert!(db.get_session_with_user("stale").unwrap().is_some());
    }

    #[test]
    fn session_expires_after_seven_days() {
        let db = test_support::db();
        sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();
        let signed_in = sign_in(&db, "ada@example.com", "hunter22").unwrap();
        let sid = Some(signed_in.session_id.as_str());

        let six_days = Utc::now() + Duration::days(6);
        let eight_days = Utc::now() + Duration::days(8);
        assert!(current_user_at(&db, sid, six_days).unwrap().is_some());
        assert!(current_user_at(&db, sid, eight_days).unwrap().is_none());
    }

    #[test]
    fn missing_or_unknown_session_is_anonymous() {
        let db = test_support::db();
        assert_eq!(current_user(&db, None).unwrap(), None);
        assert_eq!(current_user(&db, Some("")).unwrap(), None);
        assert_eq!(current_user(&db, Some("deadbeef")).unwrap(), None);
    }

    #[test]
    fn promote_and_lookup() {
        let db = test_support::db();
        let user = sign_up(&db, "ada@example.com", "hunter22", "Ada").unwrap();
        assert!(promote_to_admin(&db, "ada@example.com").unwrap());
        assert!(get_user(&db, user.id).unwrap().is_admin());
        assert!(!promote_to_admin(&db, "ghost@example.com").unwrap());
        assert!(matches!(get_user(&db, 999), Err(ServiceError::NotFound("user"))));
    }
}
