use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::invite::db::InviteDbExt;
use crate::data::invite::{InvitationCode, INVITATION_CODE_LENGTH};
use crate::data::plan::db::PlanDbExt;
use crate::data::plan::{LessonPlan, ReviewStatus};
use crate::data::quiz::db::QuizDbExt;
use crate::data::student::db::ClassDbExt;
use crate::data::user::db::UserDbExt;
use crate::data::user::User;
use crate::resp::jwt::AdminUser;
use crate::resp::problem::{bad_request, not_found, Problem};
use crate::util::generate_code;

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_users: u64,
    pub inactive_users: u64,
    pub total_lesson_plans: u64,
}

/// Platform-wide counts
#[utoipa::path(
    responses((status = 200, description = "Counts", body = AdminStats)),
    security(("jwt" = []))
)]
#[get("/admin/stats")]
#[tracing::instrument(skip_all)]
pub async fn admin_stats(
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<AdminStats>, Problem> {
    let total_users = db.count_teachers().await?;
    let active_users = db.count_active_teachers().await?;

    Ok(Json(AdminStats {
        total_users,
        active_users,
        inactive_users: total_users - active_users,
        total_lesson_plans: db.count_plans().await?,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub school: Option<String>,
    pub state: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub lesson_plan_count: u64,
}

/// All teacher accounts with activity counts
#[utoipa::path(
    responses((status = 200, description = "Teachers, newest first", body = Vec<UserDetail>)),
    security(("jwt" = []))
)]
#[get("/admin/users")]
#[tracing::instrument(skip_all)]
pub async fn admin_users(
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<Vec<UserDetail>>, Problem> {
    let teachers = db.list_teachers().await?;

    let mut out = Vec::with_capacity(teachers.len());
    for teacher in teachers {
        let lesson_plan_count = db.count_plans_for_user(teacher.id).await?;
        out.push(UserDetail {
            id: teacher.id,
            email: teacher.email,
            full_name: teacher.full_name,
            school: teacher.school,
            state: teacher.state,
            is_active: teacher.is_active,
            created_at: teacher.created_at,
            last_login: teacher.last_login,
            lesson_plan_count,
        });
    }

    Ok(Json(out))
}

/// Re-enable a teacher account
#[utoipa::path(
    params(("id", description = "user ID")),
    responses(
        (status = 200, description = "Activated"),
        (status = 404, description = "Unknown user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/users/<id>/activate")]
#[tracing::instrument(skip_all)]
pub async fn admin_activate_user(
    id: Uuid,
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.set_active(id, true).await? {
        return Err(not_found("User"));
    }
    Ok(Json(super::message("User activated.")))
}

/// Disable a teacher account, locking them out on next request
#[utoipa::path(
    params(("id", description = "user ID")),
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Unknown user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/users/<id>/deactivate")]
#[tracing::instrument(skip_all)]
pub async fn admin_deactivate_user(
    id: Uuid,
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.set_active(id, false).await? {
        return Err(not_found("User"));
    }
    Ok(Json(super::message("User deactivated.")))
}

// ---------------------------------------------------------------------------
// Invitation codes

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvitationBatch {
    #[serde(default = "one")]
    pub count: usize,
}

fn one() -> usize {
    1
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationBatchResponse {
    pub codes: Vec<String>,
    pub count: usize,
}

/// Mint a batch of single-use registration codes
#[utoipa::path(
    request_body = InvitationBatch,
    responses((status = 200, description = "The minted codes", body = InvitationBatchResponse)),
    security(("jwt" = []))
)]
#[post("/admin/invitation-codes", format = "application/json", data = "<batch>")]
#[tracing::instrument(skip_all)]
pub async fn admin_create_invitations(
    batch: Json<InvitationBatch>,
    admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<InvitationBatchResponse>, Problem> {
    let count = batch.into_inner().count.clamp(1, 100);

    let mut codes = Vec::with_capacity(count);
    for _ in 0..count {
        let code = generate_code(INVITATION_CODE_LENGTH);
        db.insert_invitation(&InvitationCode::new(&code, admin.0.id))
            .await?;
        codes.push(code);
    }

    Ok(Json(InvitationBatchResponse {
        count: codes.len(),
        codes,
    }))
}

/// An invitation code with the consuming teacher resolved, if any.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationDetail {
    #[serde(flatten)]
    pub invitation: InvitationCode,
    pub used_by_email: Option<String>,
    pub used_by_name: Option<String>,
}

/// List every invitation code
#[utoipa::path(
    responses((status = 200, description = "Codes, newest first", body = Vec<InvitationDetail>)),
    security(("jwt" = []))
)]
#[get("/admin/invitation-codes")]
#[tracing::instrument(skip_all)]
pub async fn admin_list_invitations(
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<Vec<InvitationDetail>>, Problem> {
    let invitations = db.list_invitations().await?;

    let mut out = Vec::with_capacity(invitations.len());
    for invitation in invitations {
        let user = match invitation.used_by {
            Some(id) => db.get_user(id).await?,
            None => None,
        };
        out.push(InvitationDetail {
            used_by_email: user.as_ref().map(|u| u.email.clone()),
            used_by_name: user.map(|u| u.full_name),
            invitation,
        });
    }

    Ok(Json(out))
}

/// Delete an invitation code outright
#[utoipa::path(
    params(("code", description = "the code string")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Unknown code", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/admin/invitation-codes/<code>")]
#[tracing::instrument(skip_all)]
pub async fn admin_delete_invitation(
    code: &str,
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.delete_invitation(code).await? {
        return Err(not_found("Invitation code"));
    }
    Ok(Json(super::message("Invitation code deleted.")))
}

/// Deactivate a code without losing its audit trail
#[utoipa::path(
    params(("code", description = "the code string")),
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Unknown code", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/invitation-codes/<code>/deactivate")]
#[tracing::instrument(skip_all)]
pub async fn admin_deactivate_invitation(
    code: &str,
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.deactivate_invitation(code).await? {
        return Err(not_found("Invitation code"));
    }
    Ok(Json(super::message("Invitation code deactivated.")))
}

// ---------------------------------------------------------------------------
// Supervision

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub school: Option<String>,
    pub is_active: bool,
    pub is_supervised: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherList {
    pub teachers: Vec<TeacherSummary>,
    pub supervised_ids: Vec<Uuid>,
}

/// Teachers with the admin's supervision flags
#[utoipa::path(
    responses((status = 200, description = "Teacher list", body = TeacherList)),
    security(("jwt" = []))
)]
#[get("/admin/teachers")]
#[tracing::instrument(skip_all)]
pub async fn admin_teachers(
    admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<TeacherList>, Problem> {
    let supervised = admin.0.supervised_teacher_ids;

    let teachers = db
        .list_teachers()
        .await?
        .into_iter()
        .map(|t| TeacherSummary {
            is_supervised: supervised.contains(&t.id),
            id: t.id,
            full_name: t.full_name,
            email: t.email,
            school: t.school,
            is_active: t.is_active,
        })
        .collect();

    Ok(Json(TeacherList {
        teachers,
        supervised_ids: supervised,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SupervisionUpdate {
    pub teacher_ids: Vec<Uuid>,
}

/// Replace the admin's supervised-teacher set
#[utoipa::path(
    request_body = SupervisionUpdate,
    responses((status = 200, description = "Updated")),
    security(("jwt" = []))
)]
#[post("/admin/update-supervision", format = "application/json", data = "<update>")]
#[tracing::instrument(skip_all)]
pub async fn admin_update_supervision(
    update: Json<SupervisionUpdate>,
    admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    db.set_supervised_teachers(admin.0.id, &update.into_inner().teacher_ids)
        .await?;
    Ok(Json(super::message("Supervision updated.")))
}

// ---------------------------------------------------------------------------
// Plan review

/// A lesson plan with its owner resolved for the review queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlanForReview {
    #[serde(flatten)]
    pub plan: LessonPlan,
    pub teacher_name: String,
    pub teacher_email: String,
}

async fn with_owners(db: &Database, plans: Vec<LessonPlan>) -> Result<Vec<PlanForReview>, Problem> {
    let mut out = Vec::with_capacity(plans.len());
    for plan in plans {
        let owner = db.get_user(plan.user_id).await?;
        out.push(PlanForReview {
            teacher_name: owner
                .as_ref()
                .map(|u| u.full_name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            teacher_email: owner.map(|u| u.email).unwrap_or_default(),
            plan,
        });
    }
    Ok(out)
}

fn supervision_scope(admin: &User) -> Option<&[Uuid]> {
    if admin.supervised_teacher_ids.is_empty() {
        None
    } else {
        Some(&admin.supervised_teacher_ids)
    }
}

/// Plans waiting for review, scoped to supervised teachers when set
#[utoipa::path(
    responses((status = 200, description = "Pending plans", body = Vec<PlanForReview>)),
    security(("jwt" = []))
)]
#[get("/admin/lesson-plans/pending")]
#[tracing::instrument(skip_all)]
pub async fn admin_pending_plans(
    admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<Vec<PlanForReview>>, Problem> {
    let plans = db.pending_plans(supervision_scope(&admin.0)).await?;
    Ok(Json(with_owners(db, plans).await?))
}

/// Every plan regardless of status, scoped like the pending queue
#[utoipa::path(
    responses((status = 200, description = "All plans", body = Vec<PlanForReview>)),
    security(("jwt" = []))
)]
#[get("/admin/lesson-plans/all")]
#[tracing::instrument(skip_all)]
pub async fn admin_all_plans(
    admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<Vec<PlanForReview>>, Problem> {
    let plans = db.all_plans(supervision_scope(&admin.0)).await?;
    Ok(Json(with_owners(db, plans).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlanReview {
    /// `approved` or `rejected`.
    pub status: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Record a verdict on a submitted plan
#[utoipa::path(
    params(("id", description = "lesson plan ID")),
    request_body = PlanReview,
    responses(
        (status = 200, description = "Reviewed"),
        (status = 400, description = "Status is not approved or rejected", body = Problem),
        (status = 404, description = "Unknown plan", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/lesson-plans/<id>/review", format = "application/json", data = "<review>")]
#[tracing::instrument(skip_all)]
pub async fn admin_review_plan(
    id: Uuid,
    review: Json<PlanReview>,
    admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    let review = review.into_inner();

    let status = match review.status.as_str() {
        "approved" => ReviewStatus::Approved,
        "rejected" => ReviewStatus::Rejected,
        _ => return Err(bad_request("Invalid status.")),
    };

    if !db.review_plan(id, status, review.feedback, admin.0.id).await? {
        return Err(not_found("Lesson plan"));
    }

    Ok(Json(super::message(format!("Lesson plan {status}"))))
}

// ---------------------------------------------------------------------------
// Reports

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherPlanStats {
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub school: Option<String>,
    pub total_plans: usize,
    pub submitted_plans: usize,
    /// Percentage of plans submitted for review, one decimal place.
    pub submission_rate: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonPlanReport {
    pub total_plans: usize,
    pub draft_count: usize,
    pub pending_count: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
    /// Lowest submission rate first.
    pub teacher_stats: Vec<TeacherPlanStats>,
}

/// Status counts plus per-teacher submission rates.
pub fn build_plan_report(plans: &[LessonPlan], teachers: &[User]) -> LessonPlanReport {
    let count = |status: ReviewStatus| {
        plans
            .iter()
            .filter(|p| p.submission_status == status)
            .count()
    };

    let mut teacher_stats: Vec<TeacherPlanStats> = teachers
        .iter()
        .map(|teacher| {
            let own: Vec<&LessonPlan> =
                plans.iter().filter(|p| p.user_id == teacher.id).collect();
            let submitted = own
                .iter()
                .filter(|p| {
                    matches!(
                        p.submission_status,
                        ReviewStatus::Pending | ReviewStatus::Approved
                    )
                })
                .count();
            let rate = if own.is_empty() {
                0.0
            } else {
                (submitted as f64 / own.len() as f64 * 1000.0).round() / 10.0
            };

            TeacherPlanStats {
                teacher_id: teacher.id,
                teacher_name: teacher.full_name.clone(),
                school: teacher.school.clone(),
                total_plans: own.len(),
                submitted_plans: submitted,
                submission_rate: rate,
            }
        })
        .collect();
    teacher_stats.sort_by(|a, b| {
        a.submission_rate
            .partial_cmp(&b.submission_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    LessonPlanReport {
        total_plans: plans.len(),
        draft_count: count(ReviewStatus::Draft),
        pending_count: count(ReviewStatus::Pending),
        approved_count: count(ReviewStatus::Approved),
        rejected_count: count(ReviewStatus::Rejected),
        teacher_stats,
    }
}

/// Submission compliance across teachers
#[utoipa::path(
    responses((status = 200, description = "Plan report", body = LessonPlanReport)),
    security(("jwt" = []))
)]
#[get("/admin/reports/lesson-plans")]
#[tracing::instrument(skip_all)]
pub async fn admin_plan_report(
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<LessonPlanReport>, Problem> {
    let plans = db.all_plans(None).await?;
    let teachers = db.list_teachers().await?;

    Ok(Json(build_plan_report(&plans, &teachers)))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassResult {
    pub class_name: String,
    pub submissions_count: usize,
    pub average_score: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherResults {
    pub teacher_name: String,
    pub classes: Vec<ClassResult>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SchoolResults {
    pub school: String,
    pub average_score: f64,
    pub total_submissions: usize,
    pub teachers: Vec<TeacherResults>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestResultsReport {
    /// Highest school average first.
    pub schools: Vec<SchoolResults>,
}

/// Groups per-class results under teacher, then school. Classes without
/// submissions were already dropped by the caller.
pub fn fold_schools(entries: Vec<(String, String, Vec<ClassResult>)>) -> TestResultsReport {
    let mut schools: Vec<(String, Vec<TeacherResults>)> = vec![];

    for (school, teacher_name, classes) in entries {
        if classes.is_empty() {
            continue;
        }

        if !schools.iter().any(|(name, _)| *name == school) {
            schools.push((school.clone(), vec![]));
        }
        schools
            .iter_mut()
            .find(|(name, _)| *name == school)
            .unwrap()
            .1
            .push(TeacherResults {
                teacher_name,
                classes,
            });
    }

    let mut schools: Vec<SchoolResults> = schools
        .into_iter()
        .map(|(school, teachers)| {
            let mut total_score = 0.0;
            let mut total_submissions = 0;
            for teacher in &teachers {
                for class in &teacher.classes {
                    total_score += class.average_score * class.submissions_count as f64;
                    total_submissions += class.submissions_count;
                }
            }

            SchoolResults {
                school,
                average_score: if total_submissions > 0 {
                    total_score / total_submissions as f64
                } else {
                    0.0
                },
                total_submissions,
                teachers,
            }
        })
        .collect();
    schools.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    TestResultsReport { schools }
}

/// Assessment results rolled up by school
#[utoipa::path(
    responses((status = 200, description = "Test results drill-down", body = TestResultsReport)),
    security(("jwt" = []))
)]
#[get("/admin/reports/test-results")]
#[tracing::instrument(skip_all)]
pub async fn admin_test_results(
    _admin: AdminUser,
    db: &State<Database>,
) -> Result<Json<TestResultsReport>, Problem> {
    let teachers = db.list_teachers().await?;

    let mut entries = vec![];
    for teacher in teachers {
        let mut classes = vec![];
        for class in db.classes_for_teacher(teacher.id).await? {
            let submissions = db.submissions_for_class(class.id).await?;
            if submissions.is_empty() {
                continue;
            }

            let average =
                submissions.iter().map(|s| s.score).sum::<f64>() / submissions.len() as f64;
            classes.push(ClassResult {
                class_name: class.name,
                submissions_count: submissions.len(),
                average_score: average,
            });
        }

        entries.push((
            teacher
                .school
                .unwrap_or_else(|| "Unassigned".to_string()),
            teacher.full_name,
            classes,
        ));
    }

    Ok(Json(fold_schools(entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Salt;

    fn teacher(name: &str, school: Option<&str>) -> User {
        let salt: Salt = [0u8; 16];
        let mut user = User::new(
            format!("{}@school.example", name.to_lowercase()),
            name,
            "hunter2hunter2",
            &salt,
        );
        user.school = school.map(str::to_string);
        user
    }

    fn plan(owner: Uuid, status: ReviewStatus) -> LessonPlan {
        LessonPlan {
            id: Uuid::new_v4(),
            user_id: owner,
            textbook: "Go Math".into(),
            start_date: "2025-01-13".into(),
            end_date: "2025-01-17".into(),
            lesson_range: "Ch 4".into(),
            next_major_assessment: "Unit test".into(),
            daily_plans: vec![],
            created_at: chrono::Utc::now(),
            submission_status: status,
            submitted_at: None,
            reviewed_at: None,
            admin_feedback: None,
            reviewed_by: None,
        }
    }

    #[test]
    fn plan_report_counts_statuses_and_ranks_low_submitters_first() {
        let ana = teacher("Ana", Some("North"));
        let ben = teacher("Ben", Some("North"));

        let plans = vec![
            plan(ana.id, ReviewStatus::Approved),
            plan(ana.id, ReviewStatus::Pending),
            plan(ben.id, ReviewStatus::Draft),
            plan(ben.id, ReviewStatus::Draft),
            plan(ben.id, ReviewStatus::Rejected),
        ];

        let report = build_plan_report(&plans, &[ana.clone(), ben.clone()]);

        assert_eq!(report.total_plans, 5);
        assert_eq!(report.draft_count, 2);
        assert_eq!(report.pending_count, 1);
        assert_eq!(report.approved_count, 1);
        assert_eq!(report.rejected_count, 1);

        // Ben submitted 0 of 3, Ana 2 of 2.
        assert_eq!(report.teacher_stats[0].teacher_id, ben.id);
        assert_eq!(report.teacher_stats[0].submission_rate, 0.0);
        assert_eq!(report.teacher_stats[1].submission_rate, 100.0);
    }

    #[test]
    fn plan_report_gives_zero_rate_to_teachers_without_plans() {
        let ana = teacher("Ana", None);
        let report = build_plan_report(&[], &[ana]);
        assert_eq!(report.teacher_stats[0].total_plans, 0);
        assert_eq!(report.teacher_stats[0].submission_rate, 0.0);
    }

    #[test]
    fn schools_sort_by_weighted_average() {
        let entries = vec![
            (
                "North".to_string(),
                "Ana".to_string(),
                vec![ClassResult {
                    class_name: "Period 1".into(),
                    submissions_count: 2,
                    average_score: 60.0,
                }],
            ),
            (
                "South".to_string(),
                "Ben".to_string(),
                vec![ClassResult {
                    class_name: "Period 2".into(),
                    submissions_count: 4,
                    average_score: 90.0,
                }],
            ),
            ("North".to_string(), "Cara".to_string(), vec![]),
        ];

        let report = fold_schools(entries);

        assert_eq!(report.schools.len(), 2);
        assert_eq!(report.schools[0].school, "South");
        assert_eq!(report.schools[0].average_score, 90.0);
        assert_eq!(report.schools[0].total_submissions, 4);
        // Cara had no classes with submissions and is dropped.
        assert_eq!(report.schools[1].teachers.len(), 1);
    }

    #[test]
    fn empty_entries_fold_to_no_schools() {
        let report = fold_schools(vec![]);
        assert!(report.schools.is_empty());
    }
}
