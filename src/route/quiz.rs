use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ai::parse::{clean_objective_line, extract_question_array, extract_standards, standards_block};
use crate::ai::{prompt, ChatClient};
use crate::data::plan::db::PlanDbExt;
use crate::data::plan::LessonPlan;
use crate::data::quiz::db::{QuizDbExt, QuizUpdate};
use crate::data::quiz::{Question, QuizStatus, QuizTest};
use crate::resp::jwt::AuthedUser;
use crate::resp::problem::{bad_request, generation_failed, not_found, Problem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractObjectivesRequest {
    pub lesson_plan_id: Uuid,
}

/// A candidate learning objective pulled from a day plan.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct ObjectiveItem {
    pub id: Uuid,
    pub text: String,
    pub day: String,
    pub date: String,
    pub selected: bool,
}

/// A standard code found anywhere in the plan.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct StandardItem {
    pub id: Uuid,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractObjectivesResponse {
    pub objectives: Vec<ObjectiveItem>,
    pub standards: Vec<StandardItem>,
}

/// Walks every day plan collecting objectives line by line and standard
/// codes from both the standards section and any outline kept inside
/// `teaching_lesson`.
pub fn plan_objectives(plan: &LessonPlan) -> (Vec<ObjectiveItem>, Vec<StandardItem>) {
    let mut objectives = vec![];
    let mut standards_text: Vec<String> = vec![];

    for day in &plan.daily_plans {
        if !day.standards.is_empty()
            && !day.standards.to_lowercase().contains("see full plan below")
        {
            standards_text.push(day.standards.clone());
        }

        if let Some(block) = standards_block(&day.teaching_lesson) {
            standards_text.push(block);
        }

        for line in day.learner_outcomes.lines() {
            if let Some(text) = clean_objective_line(line) {
                objectives.push(ObjectiveItem {
                    id: Uuid::new_v4(),
                    text,
                    day: day.day_name.clone(),
                    date: day.day_date.clone(),
                    selected: true,
                });
            }
        }
    }

    let standards = extract_standards(standards_text.iter().map(String::as_str))
        .into_iter()
        .map(|text| StandardItem {
            id: Uuid::new_v4(),
            text,
            selected: true,
        })
        .collect();

    (objectives, standards)
}

/// Extract objectives and standards from a lesson plan
#[utoipa::path(
    request_body = ExtractObjectivesRequest,
    responses(
        (status = 200, description = "Objectives and standards", body = ExtractObjectivesResponse),
        (status = 404, description = "No such plan for this user", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/quizzes/extract-objectives", format = "application/json", data = "<request>")]
#[tracing::instrument(skip_all)]
pub async fn extract_objectives(
    request: Json<ExtractObjectivesRequest>,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<ExtractObjectivesResponse>, Problem> {
    let plan = db
        .get_plan(request.lesson_plan_id, user.0.id)
        .await?
        .ok_or_else(|| not_found("Lesson plan"))?;

    let (objectives, standards) = plan_objectives(&plan);

    Ok(Json(ExtractObjectivesResponse {
        objectives,
        standards,
    }))
}

fn default_question_count() -> usize {
    3
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateQuestionsRequest {
    /// Standard codes to generate questions for.
    pub standards: Vec<String>,
    #[serde(default = "default_question_count")]
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<Question>,
}

/// Generate multiple-choice questions for the given standards
#[utoipa::path(
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 200, description = "Generated questions", body = GenerateQuestionsResponse),
        (status = 400, description = "No standards provided", body = Problem),
        (status = 500, description = "Generation failed", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/quizzes/generate-questions", format = "application/json", data = "<request>")]
#[tracing::instrument(skip_all)]
pub async fn generate_questions(
    request: Json<GenerateQuestionsRequest>,
    _user: AuthedUser,
    chat: &State<ChatClient>,
) -> Result<Json<GenerateQuestionsResponse>, Problem> {
    let request = request.into_inner();

    if request.standards.is_empty() {
        return Err(bad_request("No standards provided."));
    }

    let mut questions = vec![];
    for standard in &request.standards {
        let response = chat
            .complete(
                prompt::QUESTION_SYSTEM,
                &prompt::question_prompt(standard, request.count),
            )
            .await
            .map_err(generation_failed)?;

        // A malformed batch is skipped rather than failing the request.
        let Some(generated) = extract_question_array(&response) else {
            tracing::warn!("discarding unparseable question batch for {standard}");
            continue;
        };

        questions.extend(generated.into_iter().map(|q| Question {
            id: Uuid::new_v4(),
            question_text: q.question_text,
            options: q.options,
            correct_answer: q.correct_answer,
            skill: standard.clone(),
        }));
    }

    Ok(Json(GenerateQuestionsResponse { questions }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuizCreate {
    pub title: String,
    #[serde(default)]
    pub lesson_plan_id: Option<Uuid>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub status: Option<QuizStatus>,
}

/// Create a quiz
#[utoipa::path(
    request_body = QuizCreate,
    responses((status = 200, description = "The new quiz", body = QuizTest)),
    security(("jwt" = []))
)]
#[post("/quizzes", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn quiz_create(
    create: Json<QuizCreate>,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<QuizTest>, Problem> {
    let create = create.into_inner();

    let mut quiz = QuizTest::new(
        create.title,
        user.0.id,
        create.lesson_plan_id,
        create.questions,
    );
    if let Some(status) = create.status {
        quiz.status = status;
    }

    db.insert_quiz(&quiz).await?;

    Ok(Json(quiz))
}

/// List the teacher's quizzes, newest first
#[utoipa::path(
    responses((status = 200, description = "Quizzes owned by the caller", body = Vec<QuizTest>)),
    security(("jwt" = []))
)]
#[get("/quizzes")]
#[tracing::instrument(skip_all)]
pub async fn quiz_list(
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<Vec<QuizTest>>, Problem> {
    Ok(Json(db.quizzes_for_teacher(user.0.id).await?))
}

/// Fetch one quiz
#[utoipa::path(
    params(("id", description = "quiz ID")),
    responses(
        (status = 200, description = "The quiz", body = QuizTest),
        (status = 404, description = "Unknown quiz", body = Problem),
    )
)]
#[get("/quizzes/<id>")]
#[tracing::instrument(skip_all)]
pub async fn quiz_get(id: Uuid, db: &State<Database>) -> Result<Json<QuizTest>, Problem> {
    db.get_quiz(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Quiz"))
}

/// Update a quiz
#[utoipa::path(
    request_body = QuizUpdate,
    params(("id", description = "quiz ID")),
    responses(
        (status = 200, description = "Quiz updated"),
        (status = 404, description = "No such quiz for this teacher", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/quizzes/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip_all)]
pub async fn quiz_update(
    id: Uuid,
    update: Json<QuizUpdate>,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.update_quiz(id, user.0.id, &update).await? {
        return Err(not_found("Quiz"));
    }

    Ok(Json(super::message("Quiz updated successfully.")))
}

/// Delete a quiz
#[utoipa::path(
    params(("id", description = "quiz ID")),
    responses(
        (status = 200, description = "Quiz deleted"),
        (status = 404, description = "No such quiz for this teacher", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/quizzes/<id>")]
#[tracing::instrument(skip_all)]
pub async fn quiz_delete(
    id: Uuid,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.delete_quiz(id, user.0.id).await? {
        return Err(not_found("Quiz"));
    }

    Ok(Json(super::message("Quiz deleted successfully.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::plan::{DayPlan, ReviewStatus};
    use chrono::Utc;

    fn empty_day() -> DayPlan {
        DayPlan {
            day_name: "Monday".into(),
            day_date: "2025-01-13".into(),
            learner_outcomes: String::new(),
            standards: String::new(),
            materials_needed: String::new(),
            anticipatory_set: String::new(),
            teaching_lesson: String::new(),
            modeling: String::new(),
            instructional_strategies: String::new(),
            check_understanding: String::new(),
            guided_practice: String::new(),
            independent_practice: String::new(),
            closure: String::new(),
            summative_assessment: String::new(),
            formative_assessment: String::new(),
            extended_activities: String::new(),
            review_reteach: String::new(),
            early_finishers: String::new(),
        }
    }

    fn plan_with_days(days: Vec<DayPlan>) -> LessonPlan {
        LessonPlan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            textbook: "Go Math".into(),
            start_date: "2025-01-13".into(),
            end_date: "2025-01-17".into(),
            lesson_range: "4.1-4.3".into(),
            next_major_assessment: "Unit test".into(),
            daily_plans: days,
            created_at: Utc::now(),
            submission_status: ReviewStatus::Draft,
            submitted_at: None,
            reviewed_at: None,
            admin_feedback: None,
            reviewed_by: None,
        }
    }

    #[test]
    fn objectives_come_from_learner_outcomes_lines() {
        let mut day = empty_day();
        day.learner_outcomes =
            "• Students will solve two-step equations\n- x\n2. Students will graph linear functions"
                .to_string();

        let (objectives, _) = plan_objectives(&plan_with_days(vec![day]));
        assert_eq!(objectives.len(), 2);
        assert_eq!(objectives[0].text, "Students will solve two-step equations");
        assert_eq!(objectives[0].day, "Monday");
        assert!(objectives.iter().all(|o| o.selected));
    }

    #[test]
    fn standards_merge_section_and_lesson_outline() {
        let mut day = empty_day();
        day.standards = "8.EE.7: Solve linear equations".to_string();
        day.teaching_lesson = "\
1. Learner Outcomes
Solve things.
2. Standards
**8.F.1** functions
3. Materials Needed
Tiles"
            .to_string();

        let (_, standards) = plan_objectives(&plan_with_days(vec![day]));
        let texts: Vec<_> = standards.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["8.EE.7", "8.F.1"]);
    }

    #[test]
    fn placeholder_standards_text_is_ignored() {
        let mut day = empty_day();
        day.standards = "Content will be generated".to_string();

        let (_, standards) = plan_objectives(&plan_with_days(vec![day]));
        assert!(standards.is_empty());
    }

    #[test]
    fn duplicate_codes_across_days_are_merged() {
        let mut monday = empty_day();
        monday.standards = "8.EE.7: equations".to_string();
        let mut tuesday = empty_day();
        tuesday.day_name = "Tuesday".into();
        tuesday.standards = "- 8.EE.7: practice continued".to_string();

        let (_, standards) = plan_objectives(&plan_with_days(vec![monday, tuesday]));
        assert_eq!(standards.len(), 1);
        assert_eq!(standards[0].text, "8.EE.7");
    }
}
