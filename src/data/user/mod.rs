use chrono::{DateTime, Utc};
use crypto::bcrypt::bcrypt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::role::Role;
use crate::security::Salt;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

/// bcrypt digest of a SHA-256 password prehash.
///
/// The prehash keeps long passphrases inside bcrypt's 72-byte input limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(pub [u8; 24]);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>, salt: &Salt) -> PasswordHash {
        let mut out: [u8; 24] = [0; 24];

        let mut sha = Sha256::new();
        sha2::Digest::update(&mut sha, password.as_ref().as_bytes());

        bcrypt(12, salt, sha.finalize().as_slice(), &mut out);

        PasswordHash(out)
    }
}

fn true_bool() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "true_bool")]
    pub is_active: bool,
    #[serde(default)]
    pub join_code: Option<String>,
    /// For admins: teachers whose plans and reports they supervise.
    #[serde(default)]
    pub supervised_teacher_ids: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// Invitation code consumed at registration.
    #[serde(default)]
    pub invitation_code: Option<String>,

    pub pw_hash: PasswordHash,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        full_name: impl Into<String>,
        password: impl AsRef<str>,
        salt: &Salt,
    ) -> User {
        let id = Uuid::new_v4();
        tracing::info!("Creating a new user with UUID: {}", id);

        User {
            id,
            email: email.into(),
            full_name: full_name.into(),
            state: None,
            school: None,
            role: Role::Teacher,
            is_active: true,
            join_code: None,
            supervised_teacher_ids: vec![],
            created_at: Utc::now(),
            last_login: None,
            invitation_code: None,
            pw_hash: PasswordHash::new(password, salt),
        }
    }
}

/// Public user shape returned by auth endpoints. Never carries the hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub join_code: Option<String>,
    pub state: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            join_code: user.join_code.clone(),
            state: user.state.clone(),
        }
    }
}

pub mod filter {
    use bson::{doc, Document};
    use uuid::Uuid;

    #[inline]
    pub fn by_id(id: Uuid) -> Document {
        doc! { "id": id.to_string() }
    }

    #[inline]
    pub fn by_email(email: impl AsRef<str>) -> Document {
        doc! { "email": email.as_ref() }
    }

    #[inline]
    pub fn teachers() -> Document {
        doc! { "role": "teacher" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_stable_for_same_salt() {
        let salt: Salt = [7u8; 16];
        assert_eq!(
            PasswordHash::new("correct horse battery staple", &salt),
            PasswordHash::new("correct horse battery staple", &salt)
        );
    }

    #[test]
    fn password_hash_differs_across_passwords_and_salts() {
        let salt_a: Salt = [7u8; 16];
        let salt_b: Salt = [8u8; 16];

        assert_ne!(
            PasswordHash::new("password one", &salt_a),
            PasswordHash::new("password two", &salt_a)
        );
        assert_ne!(
            PasswordHash::new("password one", &salt_a),
            PasswordHash::new("password one", &salt_b)
        );
    }

    #[test]
    fn new_user_defaults() {
        let salt: Salt = [0u8; 16];
        let user = User::new("t@example.com", "Test Teacher", "hunter2hunter2", &salt);

        assert_eq!(user.role, Role::Teacher);
        assert!(user.is_active);
        assert!(user.supervised_teacher_ids.is_empty());
        assert!(user.last_login.is_none());
    }
}
