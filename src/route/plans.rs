use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::ai::parse::{parse_plan_sections, PlanSections};
use crate::ai::{prompt, ChatClient};
use crate::data::plan::db::PlanDbExt;
use crate::data::plan::{DayPlan, LessonPlan, LessonPlanCreate, ReviewStatus};
use crate::export::{render_docx, DocxDownload};
use crate::resp::jwt::AuthedUser;
use crate::resp::problem::{bad_request, generation_failed, not_found, Problem};
use crate::util::{school_days_in_range, SchoolDay};

static SECTION_PLACEHOLDER: &str = "Content will be generated";

fn or_placeholder(value: String) -> String {
    if value.is_empty() {
        SECTION_PLACEHOLDER.to_string()
    } else {
        value
    }
}

/// Assembles one day's plan from parsed sections. Unmatched sections get a
/// placeholder, except `teaching_lesson` which falls back to the raw model
/// response and the summative assessment which points at the next major
/// assessment.
fn day_plan(
    day: &SchoolDay,
    sections: PlanSections,
    response: &str,
    next_major_assessment: &str,
) -> DayPlan {
    let summative = if sections.summative_assessment.is_empty() {
        format!("Not applicable for today (next major assessment: {next_major_assessment})")
    } else {
        sections.summative_assessment
    };

    let teaching_lesson = if sections.teaching_lesson.is_empty() {
        response.to_string()
    } else {
        sections.teaching_lesson
    };

    DayPlan {
        day_name: day.day_name.to_string(),
        day_date: day.date.to_string(),
        learner_outcomes: or_placeholder(sections.learner_outcomes),
        standards: or_placeholder(sections.standards),
        materials_needed: or_placeholder(sections.materials_needed),
        anticipatory_set: or_placeholder(sections.anticipatory_set),
        teaching_lesson,
        modeling: or_placeholder(sections.modeling),
        instructional_strategies: or_placeholder(sections.instructional_strategies),
        check_understanding: or_placeholder(sections.check_understanding),
        guided_practice: or_placeholder(sections.guided_practice),
        independent_practice: or_placeholder(sections.independent_practice),
        closure: or_placeholder(sections.closure),
        summative_assessment: summative,
        formative_assessment: or_placeholder(sections.formative_assessment),
        extended_activities: or_placeholder(sections.extended_activities),
        review_reteach: or_placeholder(sections.review_reteach),
        early_finishers: or_placeholder(sections.early_finishers),
    }
}

/// Generate a lesson plan for every weekday in the range
#[utoipa::path(
    request_body = LessonPlanCreate,
    responses(
        (status = 200, description = "Generated plan", body = LessonPlan),
        (status = 400, description = "No weekdays in range or bad dates", body = Problem),
        (status = 500, description = "Generation failed", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/lesson-plans", format = "application/json", data = "<request>")]
#[tracing::instrument(skip_all)]
pub async fn plan_create(
    request: Json<LessonPlanCreate>,
    user: AuthedUser,
    db: &State<Database>,
    chat: &State<ChatClient>,
) -> Result<Json<LessonPlan>, Problem> {
    let request = request.into_inner();

    let weekdays = school_days_in_range(&request.start_date, &request.end_date)
        .ok_or_else(|| bad_request("Invalid date range, expected YYYY-MM-DD dates."))?;

    if weekdays.is_empty() {
        return Err(bad_request("No weekdays found in the date range."));
    }

    let mut daily_plans = Vec::with_capacity(weekdays.len());
    for (index, day) in weekdays.iter().enumerate() {
        let user_prompt = prompt::lesson_day_prompt(&request, day, index, weekdays.len());
        let response = chat
            .complete(prompt::LESSON_PLAN_SYSTEM, &user_prompt)
            .await
            .map_err(generation_failed)?;

        let sections = parse_plan_sections(&response);
        daily_plans.push(day_plan(
            day,
            sections,
            &response,
            &request.next_major_assessment,
        ));
    }

    let plan = LessonPlan {
        id: Uuid::new_v4(),
        user_id: user.0.id,
        textbook: request.textbook,
        start_date: request.start_date,
        end_date: request.end_date,
        lesson_range: request.lesson_range,
        next_major_assessment: request.next_major_assessment,
        daily_plans,
        created_at: chrono::Utc::now(),
        submission_status: ReviewStatus::Draft,
        submitted_at: None,
        reviewed_at: None,
        admin_feedback: None,
        reviewed_by: None,
    };

    db.insert_plan(&plan).await?;

    Ok(Json(plan))
}

/// List the current user's lesson plans, newest first
#[utoipa::path(
    responses((status = 200, description = "Plans owned by the caller", body = Vec<LessonPlan>)),
    security(("jwt" = []))
)]
#[get("/lesson-plans")]
#[tracing::instrument(skip_all)]
pub async fn plan_list(
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<Vec<LessonPlan>>, Problem> {
    Ok(Json(db.plans_for_user(user.0.id).await?))
}

/// Fetch one lesson plan
#[utoipa::path(
    params(("id", description = "lesson plan ID")),
    responses(
        (status = 200, description = "The plan", body = LessonPlan),
        (status = 404, description = "No such plan for this user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/lesson-plans/<id>")]
#[tracing::instrument(skip_all)]
pub async fn plan_get(
    id: Uuid,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<LessonPlan>, Problem> {
    db.get_plan(id, user.0.id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Lesson plan"))
}

/// Delete a lesson plan
#[utoipa::path(
    params(("id", description = "lesson plan ID")),
    responses(
        (status = 200, description = "Plan deleted"),
        (status = 404, description = "No such plan for this user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/lesson-plans/<id>")]
#[tracing::instrument(skip_all)]
pub async fn plan_delete(
    id: Uuid,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.delete_plan(id, user.0.id).await? {
        return Err(not_found("Lesson plan"));
    }

    Ok(Json(super::message("Lesson plan deleted successfully.")))
}

/// Export a lesson plan as a Word document
#[utoipa::path(
    params(("id", description = "lesson plan ID")),
    responses(
        (status = 200, description = "docx attachment"),
        (status = 404, description = "No such plan for this user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/lesson-plans/<id>/export")]
#[tracing::instrument(skip_all)]
pub async fn plan_export(
    id: Uuid,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<DocxDownload, Problem> {
    let plan = db
        .get_plan(id, user.0.id)
        .await?
        .ok_or_else(|| not_found("Lesson plan"))?;

    Ok(DocxDownload {
        bytes: render_docx(&plan)?,
        filename: format!("lesson_plan_{id}.docx"),
    })
}

/// Submit a lesson plan for admin review
#[utoipa::path(
    params(("id", description = "lesson plan ID")),
    responses(
        (status = 200, description = "Queued for review"),
        (status = 400, description = "Already pending review", body = Problem),
        (status = 404, description = "No such plan for this user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/lesson-plans/<id>/submit")]
#[tracing::instrument(skip_all)]
pub async fn plan_submit(
    id: Uuid,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    let plan = db
        .get_plan(id, user.0.id)
        .await?
        .ok_or_else(|| not_found("Lesson plan"))?;

    if plan.submission_status == ReviewStatus::Pending {
        return Err(bad_request("Plan already submitted for review."));
    }

    db.submit_plan(id, user.0.id).await?;

    Ok(Json(super::message("Lesson plan submitted for review.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsed_sections_get_placeholders() {
        let days = school_days_in_range("2025-01-13", "2025-01-13").unwrap();
        let response = "free-form text without any headings";
        let sections = parse_plan_sections(response);

        let day = day_plan(&days[0], sections, response, "Unit 4 test");
        assert_eq!(day.learner_outcomes, SECTION_PLACEHOLDER);
        assert_eq!(day.teaching_lesson, response);
        assert_eq!(
            day.summative_assessment,
            "Not applicable for today (next major assessment: Unit 4 test)"
        );
    }

    #[test]
    fn parsed_sections_survive_untouched() {
        let days = school_days_in_range("2025-01-13", "2025-01-13").unwrap();
        let response = "\
## Learner Outcomes
Solve two-step equations.
## Summative Assessment
Chapter quiz on Friday.";
        let sections = parse_plan_sections(response);

        let day = day_plan(&days[0], sections, response, "Unit 4 test");
        assert_eq!(day.learner_outcomes, "Solve two-step equations.");
        assert_eq!(day.summative_assessment, "Chapter quiz on Friday.");
        assert_eq!(day.day_name, "Monday");
    }
}
