use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

pub static INVITE_COLLECTION_NAME: &str = "invitation_codes";

pub const INVITATION_CODE_LENGTH: usize = 8;

fn true_bool() -> bool {
    true
}

/// Single-use token gating teacher self-registration.
///
/// `used_by`/`used_at` transition from `None` at most once; after that the
/// code is spent even if it stays `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvitationCode {
    pub id: Uuid,
    pub code: String,
    pub created_by: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub used_by: Option<Uuid>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(default = "true_bool")]
    pub is_active: bool,
}

impl InvitationCode {
    pub fn new(code: impl Into<String>, created_by: Uuid) -> InvitationCode {
        InvitationCode {
            id: Uuid::new_v4(),
            code: code.into(),
            created_by,
            created_at: Utc::now(),
            used_by: None,
            used_at: None,
            is_active: true,
        }
    }
}
