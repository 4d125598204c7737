use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::util::generate_code;

pub mod db;

pub static STUDENT_COLLECTION_NAME: &str = "students";
pub static SESSION_COLLECTION_NAME: &str = "student_sessions";
pub static CLASS_COLLECTION_NAME: &str = "classes";

pub const CLASS_CODE_LENGTH: usize = 6;

/// OAuth-identified learner profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// School-issued student number, set on class join when provided.
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: impl Into<String>, email: impl Into<String>, picture: Option<String>) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            student_id: None,
            picture,
            created_at: Utc::now(),
        }
    }
}

/// Server-side record backing the student session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSession {
    pub id: Uuid,
    pub student_id: Uuid,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl StudentSession {
    pub fn new(
        student_id: Uuid,
        session_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> StudentSession {
        StudentSession {
            id: Uuid::new_v4(),
            student_id,
            session_token: session_token.into(),
            expires_at,
            created_at: Utc::now(),
        }
    }
}

/// Teacher-owned roster, joined by students through `class_code`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Class {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub class_code: String,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Class {
    pub fn new(teacher_id: Uuid, name: impl Into<String>, description: Option<String>) -> Class {
        Class {
            id: Uuid::new_v4(),
            teacher_id,
            name: name.into(),
            description,
            class_code: generate_code(CLASS_CODE_LENGTH),
            student_ids: vec![],
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_class_gets_a_join_code() {
        let class = Class::new(Uuid::new_v4(), "Period 3 Math", None);
        assert_eq!(class.class_code.len(), CLASS_CODE_LENGTH);
        assert!(class.student_ids.is_empty());
    }
}
