use chrono::Utc;
use mongodb::Database;
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};

use crate::data::student::db::StudentDbExt;
use crate::data::student::Student;
use crate::resp::jwt::{auth_problem, bearer_token};
use crate::resp::problem::Problem;

pub static SESSION_COOKIE_NAME: &str = "student_session_token";

/// A student resolved from an OAuth session token, supplied either as the
/// session cookie or as a bearer token.
#[derive(Debug)]
pub struct StudentAuth(pub Student);

/// Session token from the request, cookie first, `Authorization` header as
/// fallback.
pub fn session_token(req: &Request<'_>) -> Option<String> {
    req.cookies()
        .get(SESSION_COOKIE_NAME)
        .map(|it| it.value().to_string())
        .or_else(|| bearer_token(req).map(str::to_string))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StudentAuth {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match session_token(req) {
            Some(it) => it,
            None => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    auth_problem("Not authenticated."),
                ));
            }
        };

        let db: &Database = req.rocket().state().unwrap();

        let session = match db.find_session(&token).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    auth_problem("Invalid session."),
                ));
            }
            Err(e) => return request::Outcome::Error((Status::InternalServerError, e)),
        };

        if session.expires_at < Utc::now() {
            return request::Outcome::Error((
                Status::Unauthorized,
                auth_problem("Session expired."),
            ));
        }

        match db.get_student(session.student_id).await {
            Ok(Some(student)) => request::Outcome::Success(StudentAuth(student)),
            Ok(None) => request::Outcome::Error((
                Status::Unauthorized,
                auth_problem("Student not found."),
            )),
            Err(e) => request::Outcome::Error((Status::InternalServerError, e)),
        }
    }
}
