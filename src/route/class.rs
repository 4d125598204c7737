use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::student::db::{ClassDbExt, StudentDbExt};
use crate::data::student::{Class, Student};
use crate::resp::jwt::AuthedUser;
use crate::resp::problem::{not_found, Problem};
use crate::resp::session::StudentAuth;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A class with its roster resolved to student records.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClassWithRoster {
    #[serde(flatten)]
    pub class: Class,
    pub students: Vec<Student>,
    pub student_count: usize,
}

/// Create a class
#[utoipa::path(
    request_body = ClassCreate,
    responses((status = 200, description = "The new class with its join code", body = Class)),
    security(("jwt" = []))
)]
#[post("/classes", format = "application/json", data = "<create>")]
#[tracing::instrument(skip_all)]
pub async fn class_create(
    create: Json<ClassCreate>,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<Class>, Problem> {
    let create = create.into_inner();
    let class = Class::new(user.0.id, create.name, create.description);
    db.insert_class(&class).await?;

    Ok(Json(class))
}

/// List the teacher's classes with their rosters
#[utoipa::path(
    responses((status = 200, description = "Classes with students", body = Vec<ClassWithRoster>)),
    security(("jwt" = []))
)]
#[get("/classes")]
#[tracing::instrument(skip_all)]
pub async fn class_list(
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<Vec<ClassWithRoster>>, Problem> {
    let classes = db.classes_for_teacher(user.0.id).await?;

    let mut out = Vec::with_capacity(classes.len());
    for class in classes {
        let students = db.students_by_ids(&class.student_ids).await?;
        out.push(ClassWithRoster {
            student_count: students.len(),
            students,
            class,
        });
    }

    Ok(Json(out))
}

/// Delete a class
#[utoipa::path(
    params(("id", description = "class ID")),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 404, description = "No such class for this teacher", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/classes/<id>")]
#[tracing::instrument(skip_all)]
pub async fn class_delete(
    id: Uuid,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if !db.delete_class(id, user.0.id).await? {
        return Err(not_found("Class"));
    }

    Ok(Json(super::message("Class deleted successfully.")))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassJoin {
    pub class_code: String,
    /// School-issued student number, stored on the profile when supplied.
    #[serde(default)]
    pub student_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassJoinResponse {
    pub message: String,
    pub class_name: String,
    pub student_id: Uuid,
}

/// Student joins a class by code
#[utoipa::path(
    request_body = ClassJoin,
    responses(
        (status = 200, description = "Joined", body = ClassJoinResponse),
        (status = 401, description = "No valid student session", body = Problem),
        (status = 404, description = "Unknown class code", body = Problem),
    )
)]
#[post("/classes/join", format = "application/json", data = "<join>")]
#[tracing::instrument(skip_all)]
pub async fn class_join(
    join: Json<ClassJoin>,
    student: StudentAuth,
    db: &State<Database>,
) -> Result<Json<ClassJoinResponse>, Problem> {
    let join = join.into_inner();
    let StudentAuth(student) = student;

    let class = db
        .find_class_by_code(&join.class_code)
        .await?
        .ok_or_else(|| not_found("Class code"))?;

    if let Some(number) = &join.student_id {
        db.set_student_number(student.id, number).await?;
    }

    db.add_student_to_class(&join.class_code, student.id).await?;

    Ok(Json(ClassJoinResponse {
        message: "Joined class successfully.".to_string(),
        class_name: class.name,
        student_id: student.id,
    }))
}
