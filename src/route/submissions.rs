use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::quiz::db::QuizDbExt;
use crate::data::quiz::{score_answers, Assignment, QuizTest, StudentAnswer, Submission};
use crate::data::student::db::ClassDbExt;
use crate::resp::jwt::AuthedUser;
use crate::resp::problem::{not_found, Problem};
use crate::resp::session::StudentAuth;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentCreate {
    pub test_id: Uuid,
    pub class_ids: Vec<Uuid>,
}

/// Assign a quiz to one or more classes, publishing it
#[utoipa::path(
    request_body = AssignmentCreate,
    responses(
        (status = 200, description = "The assignment", body = Assignment),
        (status = 404, description = "Unknown quiz", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/assignments", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn assignment_create(
    create: Json<AssignmentCreate>,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<Assignment>, Problem> {
    let create = create.into_inner();

    // Publishing doubles as the existence/ownership check; nothing is
    // persisted for a quiz the caller does not own.
    if !db.publish_quiz(create.test_id, user.0.id).await? {
        return Err(not_found("Quiz"));
    }

    let assignment = Assignment::new(create.test_id, create.class_ids);
    db.insert_assignment(&assignment).await?;

    Ok(Json(assignment))
}

/// An assignment joined with its quiz and the student's completion state.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAssignment {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub quiz: QuizTest,
    pub completed: bool,
    pub score: Option<f64>,
}

/// List assignments for the authenticated student's classes
#[utoipa::path(
    responses(
        (status = 200, description = "Assignments with completion state", body = Vec<StudentAssignment>),
        (status = 401, description = "No valid student session", body = Problem),
    )
)]
#[get("/assignments/student")]
#[tracing::instrument(skip_all)]
pub async fn student_assignments(
    student: StudentAuth,
    db: &State<Database>,
) -> Result<Json<Vec<StudentAssignment>>, Problem> {
    let StudentAuth(student) = student;

    let classes = db.classes_containing_student(student.id).await?;
    let class_ids: Vec<Uuid> = classes.iter().map(|c| c.id).collect();

    let assignments = db.assignments_for_classes(&class_ids).await?;

    let mut out = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let Some(quiz) = db.get_quiz(assignment.test_id).await? else {
            continue;
        };

        let submission = db.find_submission(quiz.id, student.id).await?;
        out.push(StudentAssignment {
            completed: submission.is_some(),
            score: submission.map(|s| s.score),
            quiz,
            assignment,
        });
    }

    Ok(Json(out))
}

/// The class the submission should be attributed to: the first assigned
/// class the student belongs to, then any class the student belongs to.
pub fn resolve_submission_class(
    assignments: &[Assignment],
    student_classes: &[Uuid],
) -> Option<Uuid> {
    assignments
        .iter()
        .flat_map(|a| a.class_ids.iter())
        .find(|id| student_classes.contains(id))
        .or_else(|| student_classes.first())
        .copied()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmissionCreate {
    pub test_id: Uuid,
    pub answers: Vec<StudentAnswer>,
}

/// Submit quiz answers for grading
#[utoipa::path(
    request_body = SubmissionCreate,
    responses(
        (status = 200, description = "Graded submission", body = Submission),
        (status = 401, description = "No valid student session", body = Problem),
        (status = 404, description = "Unknown quiz", body = Problem),
    )
)]
#[post("/submissions", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn submission_create(
    create: Json<SubmissionCreate>,
    student: StudentAuth,
    db: &State<Database>,
) -> Result<Json<Submission>, Problem> {
    let create = create.into_inner();
    let StudentAuth(student) = student;

    let quiz = db
        .get_quiz(create.test_id)
        .await?
        .ok_or_else(|| not_found("Quiz"))?;

    let assignments = db.assignments_for_test(quiz.id).await?;
    let student_classes: Vec<Uuid> = db
        .classes_containing_student(student.id)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();

    let class_id = resolve_submission_class(&assignments, &student_classes);

    let (score, skills_breakdown) = score_answers(&quiz, &create.answers);

    let submission = Submission {
        id: Uuid::new_v4(),
        test_id: quiz.id,
        student_id: student.id,
        class_id,
        answers: create.answers,
        score,
        skills_breakdown,
        submitted_at: chrono::Utc::now(),
    };

    db.insert_submission(&submission).await?;

    Ok(Json(submission))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_an_assigned_class_the_student_is_in() {
        let assigned = Uuid::new_v4();
        let other = Uuid::new_v4();
        let assignments = vec![Assignment::new(Uuid::new_v4(), vec![other, assigned])];

        let resolved = resolve_submission_class(&assignments, &[assigned]);
        assert_eq!(resolved, Some(assigned));
    }

    #[test]
    fn falls_back_to_the_students_first_class() {
        let first = Uuid::new_v4();
        let assignments = vec![Assignment::new(Uuid::new_v4(), vec![Uuid::new_v4()])];

        let resolved = resolve_submission_class(&assignments, &[first, Uuid::new_v4()]);
        assert_eq!(resolved, Some(first));
    }

    #[test]
    fn none_when_student_has_no_classes() {
        assert_eq!(resolve_submission_class(&[], &[]), None);
    }
}
