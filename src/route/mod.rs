use std::collections::BTreeMap;

use rocket::serde::json::Json;
use rocket::{Build, Rocket, Route};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod class;
pub mod plans;
pub mod quiz;
pub mod submissions;

use admin::*;
use analytics::*;
use auth::*;
use class::*;
use plans::*;
use quiz::*;
use submissions::*;

use crate::data::invite::InvitationCode;
use crate::data::plan as plan_data;
use crate::data::quiz as quiz_data;
use crate::data::quiz::db::QuizUpdate;
use crate::data::student::{Class, Student};
use crate::data::user::UserSummary;
use crate::resp::jwt::doc::JWTAuth;
use crate::resp::problem::Problem;
use crate::role::Role;

/// Plain confirmation body used by mutation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub message: String,
}

pub fn message(text: impl Into<String>) -> Message {
    Message {
        message: text.into(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe
#[utoipa::path(responses((status = 200, description = "Service is up", body = Health)))]
#[get("/health")]
pub fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        // auth
        register,
        login,
        me,
        change_password,
        student_session,
        student_me,
        student_logout,
        // lesson plans
        plan_create,
        plan_list,
        plan_get,
        plan_delete,
        plan_export,
        plan_submit,
        // classes
        class_create,
        class_list,
        class_delete,
        class_join,
        // quizzes
        extract_objectives,
        generate_questions,
        quiz_create,
        quiz_list,
        quiz_get,
        quiz_update,
        quiz_delete,
        // assignments and submissions
        assignment_create,
        student_assignments,
        submission_create,
        // analytics
        class_analytics,
        remediation_suggestions,
        test_report,
        student_profile,
        groupings,
        standards_coverage,
        at_risk_students,
        // admin
        admin_stats,
        admin_users,
        admin_activate_user,
        admin_deactivate_user,
        admin_create_invitations,
        admin_list_invitations,
        admin_delete_invitation,
        admin_deactivate_invitation,
        admin_teachers,
        admin_update_supervision,
        admin_pending_plans,
        admin_all_plans,
        admin_review_plan,
        admin_plan_report,
        admin_test_results,
    ),
    components(schemas(
        Role,
        Problem,
        Message,
        Health,
        UserSummary,
        Student,
        Class,
        InvitationCode,
        plan_data::ReviewStatus,
        plan_data::DayPlan,
        plan_data::LessonPlan,
        plan_data::LessonPlanCreate,
        quiz_data::Question,
        quiz_data::QuizStatus,
        quiz_data::QuizTest,
        quiz_data::Assignment,
        quiz_data::StudentAnswer,
        quiz_data::SkillBreakdown,
        quiz_data::Submission,
        QuizUpdate,
        UserRegister,
        UserLogin,
        ChangePassword,
        AuthResponse,
        MeResponse,
        StudentSessionResponse,
        ClassCreate,
        ClassWithRoster,
        ClassJoin,
        ClassJoinResponse,
        ExtractObjectivesRequest,
        ObjectiveItem,
        StandardItem,
        ExtractObjectivesResponse,
        GenerateQuestionsRequest,
        GenerateQuestionsResponse,
        QuizCreate,
        AssignmentCreate,
        StudentAssignment,
        SubmissionCreate,
        NoData,
        StrugglingStudent,
        SkillStat,
        StudentStat,
        QuizStat,
        ClassAnalytics,
        RemediationRequest,
        RemediationResponse,
        StandardScore,
        StandardReport,
        StudentResult,
        QuestionAnalysis,
        TestReport,
        ScoreTrend,
        StandardAverage,
        TestHistoryEntry,
        StudentProfile,
        Grouping,
        GroupingsResponse,
        AssessedStandard,
        StandardsCoverage,
        RiskTrend,
        Priority,
        AtRiskStudent,
        AtRiskReport,
        AdminStats,
        UserDetail,
        InvitationBatch,
        InvitationBatchResponse,
        InvitationDetail,
        TeacherSummary,
        TeacherList,
        SupervisionUpdate,
        PlanForReview,
        PlanReview,
        TeacherPlanStats,
        LessonPlanReport,
        ClassResult,
        TeacherResults,
        SchoolResults,
        TestResultsReport,
    )),
    modifiers(&JWTAuth, &API_PREFIX)
)]
pub struct ApiDoc;

pub struct PathPrefix(pub &'static str);
static API_PREFIX: PathPrefix = PathPrefix("/api");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

pub fn api() -> Vec<Route> {
    routes![
        health,
        register,
        login,
        me,
        change_password,
        student_session,
        student_me,
        student_logout,
        plan_create,
        plan_list,
        plan_get,
        plan_delete,
        plan_export,
        plan_submit,
        class_create,
        class_list,
        class_delete,
        class_join,
        extract_objectives,
        generate_questions,
        quiz_create,
        quiz_list,
        quiz_get,
        quiz_update,
        quiz_delete,
        assignment_create,
        student_assignments,
        submission_create,
        class_analytics,
        remediation_suggestions,
        test_report,
        student_profile,
        groupings,
        standards_coverage,
        at_risk_students,
        admin_stats,
        admin_users,
        admin_activate_user,
        admin_deactivate_user,
        admin_create_invitations,
        admin_list_invitations,
        admin_delete_invitation,
        admin_deactivate_invitation,
        admin_teachers,
        admin_update_supervision,
        admin_pending_plans,
        admin_all_plans,
        admin_review_plan,
        admin_plan_report,
        admin_test_results,
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api()).mount(
        "/",
        SwaggerUi::new("/swagger/<_..>").url("/api/openapi.json", ApiDoc::openapi()),
    )
}
