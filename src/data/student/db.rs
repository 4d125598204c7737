use bson::doc;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::user::filter;
use crate::resp::problem::Problem;

use super::{
    Class, Student, StudentSession, CLASS_COLLECTION_NAME, SESSION_COLLECTION_NAME,
    STUDENT_COLLECTION_NAME,
};

pub trait StudentDbExt {
    async fn insert_student(&self, student: &Student) -> Result<(), Problem>;
    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, Problem>;
    async fn find_student_by_email(&self, email: impl AsRef<str>)
        -> Result<Option<Student>, Problem>;
    async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Problem>;
    async fn set_student_number(&self, id: Uuid, number: impl AsRef<str>) -> Result<(), Problem>;

    async fn insert_session(&self, session: &StudentSession) -> Result<(), Problem>;
    async fn find_session(&self, token: impl AsRef<str>)
        -> Result<Option<StudentSession>, Problem>;
    async fn delete_session(&self, token: impl AsRef<str>) -> Result<(), Problem>;
}

pub trait ClassDbExt {
    async fn insert_class(&self, class: &Class) -> Result<(), Problem>;
    async fn get_class(&self, id: Uuid) -> Result<Option<Class>, Problem>;
    async fn find_class_by_code(&self, code: impl AsRef<str>) -> Result<Option<Class>, Problem>;
    async fn classes_for_teacher(&self, teacher: Uuid) -> Result<Vec<Class>, Problem>;
    /// Classes whose roster contains the student.
    async fn classes_containing_student(&self, student: Uuid) -> Result<Vec<Class>, Problem>;
    async fn delete_class(&self, id: Uuid, teacher: Uuid) -> Result<bool, Problem>;

    /// Adds the student to the roster; `$addToSet` keeps the operation
    /// idempotent when a student joins with the same code twice.
    async fn add_student_to_class(
        &self,
        code: impl AsRef<str>,
        student: Uuid,
    ) -> Result<(), Problem>;
}

impl StudentDbExt for Database {
    async fn insert_student(&self, student: &Student) -> Result<(), Problem> {
        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .insert_one(student, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, Problem> {
        self.collection(STUDENT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_student_by_email(
        &self,
        email: impl AsRef<str>,
    ) -> Result<Option<Student>, Problem> {
        self.collection(STUDENT_COLLECTION_NAME)
            .find_one(filter::by_email(email), None)
            .await
            .map_err(Problem::from)
    }

    async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Problem> {
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        self.collection(STUDENT_COLLECTION_NAME)
            .find(doc! { "id": { "$in": ids } }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn set_student_number(&self, id: Uuid, number: impl AsRef<str>) -> Result<(), Problem> {
        self.collection::<Student>(STUDENT_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$set": { "student_id": number.as_ref() } },
                None,
            )
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn insert_session(&self, session: &StudentSession) -> Result<(), Problem> {
        self.collection::<StudentSession>(SESSION_COLLECTION_NAME)
            .insert_one(session, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn find_session(
        &self,
        token: impl AsRef<str>,
    ) -> Result<Option<StudentSession>, Problem> {
        self.collection(SESSION_COLLECTION_NAME)
            .find_one(doc! { "session_token": token.as_ref() }, None)
            .await
            .map_err(Problem::from)
    }

    async fn delete_session(&self, token: impl AsRef<str>) -> Result<(), Problem> {
        self.collection::<StudentSession>(SESSION_COLLECTION_NAME)
            .delete_one(doc! { "session_token": token.as_ref() }, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }
}

impl ClassDbExt for Database {
    async fn insert_class(&self, class: &Class) -> Result<(), Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .insert_one(class, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn get_class(&self, id: Uuid) -> Result<Option<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_class_by_code(&self, code: impl AsRef<str>) -> Result<Option<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find_one(doc! { "class_code": code.as_ref() }, None)
            .await
            .map_err(Problem::from)
    }

    async fn classes_for_teacher(&self, teacher: Uuid) -> Result<Vec<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find(doc! { "teacher_id": teacher.to_string() }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn classes_containing_student(&self, student: Uuid) -> Result<Vec<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find(doc! { "student_ids": student.to_string() }, None)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn delete_class(&self, id: Uuid, teacher: Uuid) -> Result<bool, Problem> {
        let result = self
            .collection::<Class>(CLASS_COLLECTION_NAME)
            .delete_one(
                doc! { "id": id.to_string(), "teacher_id": teacher.to_string() },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.deleted_count > 0)
    }

    async fn add_student_to_class(
        &self,
        code: impl AsRef<str>,
        student: Uuid,
    ) -> Result<(), Problem> {
        self.collection::<Class>(CLASS_COLLECTION_NAME)
            .update_one(
                doc! { "class_code": code.as_ref() },
                doc! { "$addToSet": { "student_ids": student.to_string() } },
                None,
            )
            .await
            .map_err(Problem::from)?;
        Ok(())
    }
}
