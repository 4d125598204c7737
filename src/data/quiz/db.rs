use bson::doc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::user::filter;
use crate::resp::problem::Problem;

use super::{
    Assignment, Question, QuizStatus, QuizTest, Submission, ASSIGNMENT_COLLECTION_NAME,
    QUIZ_COLLECTION_NAME, SUBMISSION_COLLECTION_NAME,
};

/// Partial update for a draft test; absent fields are left alone.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuizUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
    #[serde(default)]
    pub status: Option<QuizStatus>,
}

pub trait QuizDbExt {
    async fn insert_quiz(&self, test: &QuizTest) -> Result<(), Problem>;
    async fn quizzes_for_teacher(&self, teacher: Uuid) -> Result<Vec<QuizTest>, Problem>;
    async fn get_quiz(&self, id: Uuid) -> Result<Option<QuizTest>, Problem>;
    async fn update_quiz(&self, id: Uuid, teacher: Uuid, update: &QuizUpdate)
        -> Result<bool, Problem>;
    async fn delete_quiz(&self, id: Uuid, teacher: Uuid) -> Result<bool, Problem>;
    async fn publish_quiz(&self, id: Uuid, teacher: Uuid) -> Result<bool, Problem>;

    async fn insert_assignment(&self, assignment: &Assignment) -> Result<(), Problem>;
    async fn assignments_for_test(&self, test: Uuid) -> Result<Vec<Assignment>, Problem>;
    /// Assignments targeting any of the given classes.
    async fn assignments_for_classes(&self, classes: &[Uuid]) -> Result<Vec<Assignment>, Problem>;

    async fn insert_submission(&self, submission: &Submission) -> Result<(), Problem>;
    async fn submissions_for_class(&self, class: Uuid) -> Result<Vec<Submission>, Problem>;
    async fn submissions_for_test(&self, test: Uuid) -> Result<Vec<Submission>, Problem>;
    /// The student's submissions, oldest first so trends read left to right.
    async fn submissions_for_student(&self, student: Uuid) -> Result<Vec<Submission>, Problem>;
    async fn submissions_for_tests(&self, tests: &[Uuid]) -> Result<Vec<Submission>, Problem>;
    async fn find_submission(&self, test: Uuid, student: Uuid)
        -> Result<Option<Submission>, Problem>;
}

impl QuizDbExt for Database {
    async fn insert_quiz(&self, test: &QuizTest) -> Result<(), Problem> {
        self.collection::<QuizTest>(QUIZ_COLLECTION_NAME)
            .insert_one(test, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn quizzes_for_teacher(&self, teacher: Uuid) -> Result<Vec<QuizTest>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        self.collection(QUIZ_COLLECTION_NAME)
            .find(doc! { "teacher_id": teacher.to_string() }, options)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn get_quiz(&self, id: Uuid) -> Result<Option<QuizTest>, Problem> {
        self.collection(QUIZ_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn update_quiz(
        &self,
        id: Uuid,
        teacher: Uuid,
        update: &QuizUpdate,
    ) -> Result<bool, Problem> {
        let mut set = doc! {};
        if let Some(title) = &update.title {
            set.insert("title", title);
        }
        if let Some(questions) = &update.questions {
            set.insert("questions", bson::to_bson(questions)?);
        }
        if let Some(status) = &update.status {
            set.insert("status", status.to_string());
        }
        if set.is_empty() {
            return Ok(true);
        }

        let result = self
            .collection::<QuizTest>(QUIZ_COLLECTION_NAME)
            .update_one(
                doc! { "id": id.to_string(), "teacher_id": teacher.to_string() },
                doc! { "$set": set },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn delete_quiz(&self, id: Uuid, teacher: Uuid) -> Result<bool, Problem> {
        let result = self
            .collection::<QuizTest>(QUIZ_COLLECTION_NAME)
            .delete_one(
                doc! { "id": id.to_string(), "teacher_id": teacher.to_string() },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.deleted_count > 0)
    }

    async fn publish_quiz(&self, id: Uuid, teacher: Uuid) -> Result<bool, Problem> {
        let result = self
            .collection::<QuizTest>(QUIZ_COLLECTION_NAME)
            .update_one(
                doc! { "id": id.to_string(), "teacher_id": teacher.to_string() },
                doc! { "$set": { "status": QuizStatus::Published.to_string() } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn insert_assignment(&self, assignment: &Assignment) -> Result<(), Problem> {
        self.collection::<Assignment>(ASSIGNMENT_COLLECTION_NAME)
            .insert_one(assignment, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn assignments_for_test(&self, test: Uuid) -> Result<Vec<Assignment>, Problem> {
        self.collection(ASSIGNMENT_COLLECTION_NAME)
            .find(doc! { "test_id": test.to_string() }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn assignments_for_classes(&self, classes: &[Uuid]) -> Result<Vec<Assignment>, Problem> {
        let ids: Vec<String> = classes.iter().map(Uuid::to_string).collect();

        self.collection(ASSIGNMENT_COLLECTION_NAME)
            .find(doc! { "class_ids": { "$in": ids } }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<(), Problem> {
        self.collection::<Submission>(SUBMISSION_COLLECTION_NAME)
            .insert_one(submission, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn submissions_for_class(&self, class: Uuid) -> Result<Vec<Submission>, Problem> {
        self.collection(SUBMISSION_COLLECTION_NAME)
            .find(doc! { "class_id": class.to_string() }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn submissions_for_test(&self, test: Uuid) -> Result<Vec<Submission>, Problem> {
        self.collection(SUBMISSION_COLLECTION_NAME)
            .find(doc! { "test_id": test.to_string() }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn submissions_for_student(&self, student: Uuid) -> Result<Vec<Submission>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "submitted_at": 1 })
            .build();

        self.collection(SUBMISSION_COLLECTION_NAME)
            .find(doc! { "student_id": student.to_string() }, options)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn submissions_for_tests(&self, tests: &[Uuid]) -> Result<Vec<Submission>, Problem> {
        let ids: Vec<String> = tests.iter().map(Uuid::to_string).collect();

        self.collection(SUBMISSION_COLLECTION_NAME)
            .find(doc! { "test_id": { "$in": ids } }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn find_submission(
        &self,
        test: Uuid,
        student: Uuid,
    ) -> Result<Option<Submission>, Problem> {
        self.collection(SUBMISSION_COLLECTION_NAME)
            .find_one(
                doc! { "test_id": test.to_string(), "student_id": student.to_string() },
                None,
            )
            .await
            .map_err(Problem::from)
    }
}
