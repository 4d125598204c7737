use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

pub static PLAN_COLLECTION_NAME: &str = "lesson_plans";

/// Review workflow for submitted plans.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl std::default::Default for ReviewStatus {
    fn default() -> Self {
        ReviewStatus::Draft
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Draft => write!(f, "draft"),
            ReviewStatus::Pending => write!(f, "pending"),
            ReviewStatus::Approved => write!(f, "approved"),
            ReviewStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// One weekday's worth of generated lesson content.
///
/// The sixteen free-text sections mirror the prompt sent to the model; the
/// parser fills them best-effort and the export writer prints them in this
/// order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DayPlan {
    /// e.g. "Monday"
    pub day_name: String,
    /// e.g. "2025-01-15"
    pub day_date: String,

    pub learner_outcomes: String,
    pub standards: String,
    pub materials_needed: String,
    pub anticipatory_set: String,
    pub teaching_lesson: String,
    pub modeling: String,
    pub instructional_strategies: String,
    pub check_understanding: String,
    pub guided_practice: String,
    pub independent_practice: String,
    pub closure: String,
    pub summative_assessment: String,
    pub formative_assessment: String,
    pub extended_activities: String,
    pub review_reteach: String,
    pub early_finishers: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LessonPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub textbook: String,
    pub start_date: String,
    pub end_date: String,
    pub lesson_range: String,
    pub next_major_assessment: String,
    pub daily_plans: Vec<DayPlan>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub submission_status: ReviewStatus,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub admin_feedback: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<Uuid>,
}

/// Request body for generating a new plan.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LessonPlanCreate {
    pub textbook: String,
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: String,
    /// Inclusive, `YYYY-MM-DD`.
    pub end_date: String,
    pub lesson_range: String,
    pub next_major_assessment: String,
    #[serde(default)]
    pub state_standards: Option<String>,
}
