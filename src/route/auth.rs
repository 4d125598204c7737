use chrono::{Duration, Utc};
use mongodb::Database;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::request::{self, FromRequest, Request};
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;
use crate::data::invite::db::InviteDbExt;
use crate::data::student::db::StudentDbExt;
use crate::data::student::{Student, StudentSession};
use crate::data::user::db::UserDbExt;
use crate::data::user::{PasswordHash, User, UserSummary};
use crate::oauth;
use crate::resp::jwt::{AuthToken, AuthedUser};
use crate::resp::problem::{bad_request, Problem};
use crate::resp::session::{StudentAuth, SESSION_COOKIE_NAME};
use crate::security::Security;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserRegister {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    pub invitation_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

/// Token plus the public user shape, returned by register and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

fn issue_token(user: &User, config: &Config) -> Result<String, Problem> {
    AuthToken::new(user, config.jwt_expiry_hours)
        .encode_jwt(&config.jwt_secret)
        .map_err(Problem::from)
}

/// Register a teacher account using a single-use invitation code
#[utoipa::path(
    request_body = UserRegister,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Bad invitation code or duplicate email", body = Problem),
    )
)]
#[post("/auth/register", format = "application/json", data = "<register>")]
#[tracing::instrument(skip_all)]
pub async fn register(
    register: Json<UserRegister>,
    db: &State<Database>,
    config: &State<Config>,
    security: &State<Security>,
) -> Result<Json<AuthResponse>, Problem> {
    let register = register.into_inner();

    let invitation = db
        .find_active_invitation(&register.invitation_code)
        .await?
        .ok_or_else(|| bad_request("Invalid or inactive invitation code."))?;

    if invitation.used_by.is_some() {
        return Err(bad_request("This invitation code has already been used."));
    }

    if db.find_user_by_email(&register.email).await?.is_some() {
        return Err(bad_request("Email already registered."));
    }

    let mut user = User::new(
        &register.email,
        &register.full_name,
        &register.password,
        &security.salt,
    );
    user.state = register.state;
    user.school = register.school;
    user.invitation_code = Some(register.invitation_code.clone());

    db.insert_user(&user).await?;

    // A lost race here means the code was spent between validation and now.
    if !db
        .consume_invitation(&register.invitation_code, user.id)
        .await?
    {
        return Err(bad_request("This invitation code has already been used."));
    }

    let token = issue_token(&user, config)?;

    Ok(Json(AuthResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

/// Log in with email and password
#[utoipa::path(
    request_body = UserLogin,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Unknown email or wrong password", body = Problem),
        (status = 403, description = "Account is deactivated", body = Problem),
    )
)]
#[post("/auth/login", format = "application/json", data = "<login>")]
#[tracing::instrument(skip_all)]
pub async fn login(
    login: Json<UserLogin>,
    db: &State<Database>,
    config: &State<Config>,
    security: &State<Security>,
) -> Result<Json<AuthResponse>, Problem> {
    let login = login.into_inner();

    let user = db
        .find_user_by_email(&login.email)
        .await?
        .filter(|user| user.pw_hash == PasswordHash::new(&login.password, &security.salt))
        .ok_or_else(|| {
            Problem::new_untyped(Status::Unauthorized, "Invalid email or password.")
        })?;

    if !user.is_active {
        return Err(crate::resp::problem::forbidden("Account is deactivated."));
    }

    db.touch_last_login(user.id).await?;

    let token = issue_token(&user, config)?;

    Ok(Json(AuthResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub is_active: bool,
}

/// Current teacher or admin account
#[utoipa::path(
    responses(
        (status = 200, description = "Current user info", body = MeResponse),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/auth/me")]
#[tracing::instrument(skip_all)]
pub async fn me(user: AuthedUser) -> Json<MeResponse> {
    let AuthedUser(user) = user;

    Json(MeResponse {
        is_active: user.is_active,
        user: UserSummary::from(&user),
    })
}

/// Change the current user's password
#[utoipa::path(
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is incorrect", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/auth/change-password", format = "application/json", data = "<change>")]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    change: Json<ChangePassword>,
    user: AuthedUser,
    db: &State<Database>,
    security: &State<Security>,
) -> Result<Json<super::Message>, Problem> {
    let AuthedUser(user) = user;
    let change = change.into_inner();

    if user.pw_hash != PasswordHash::new(&change.current_password, &security.salt) {
        return Err(bad_request("Current password is incorrect."));
    }

    let hash = PasswordHash::new(&change.new_password, &security.salt);
    db.set_password(user.id, &hash).await?;

    Ok(Json(super::message("Password changed successfully.")))
}

/// `X-Session-ID` header carrying the frontend's one-time OAuth session id.
#[derive(Debug)]
pub struct SessionId(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionId {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.headers().get_one("X-Session-ID") {
            Some(id) if !id.is_empty() => request::Outcome::Success(SessionId(id.to_string())),
            _ => request::Outcome::Error((
                Status::BadRequest,
                bad_request("Session ID required."),
            )),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentSessionResponse {
    pub student: Student,
    pub session_token: String,
}

/// Exchange an OAuth session id for a student session
#[utoipa::path(
    responses(
        (status = 200, description = "Student session established", body = StudentSessionResponse),
        (status = 400, description = "Missing X-Session-ID header", body = Problem),
        (status = 401, description = "Upstream rejected the session id", body = Problem),
    )
)]
#[post("/auth/student/session")]
#[tracing::instrument(skip_all)]
pub async fn student_session(
    session_id: SessionId,
    db: &State<Database>,
    config: &State<Config>,
    http: &State<reqwest::Client>,
) -> Result<Json<StudentSessionResponse>, Problem> {
    let identity =
        oauth::fetch_session_data(http, &config.oauth_session_url, &session_id.0).await?;

    let student = match db.find_student_by_email(&identity.email).await? {
        Some(student) => student,
        None => {
            let student = Student::new(&identity.name, &identity.email, identity.picture.clone());
            db.insert_student(&student).await?;
            student
        }
    };

    let expires_at = Utc::now() + Duration::days(config.session_expiry_days);
    let session = StudentSession::new(student.id, &identity.session_token, expires_at);
    db.insert_session(&session).await?;

    Ok(Json(StudentSessionResponse {
        student,
        session_token: identity.session_token,
    }))
}

/// Current student profile
#[utoipa::path(
    responses(
        (status = 200, description = "Current student", body = Student),
        (status = 401, description = "No valid session", body = Problem),
    )
)]
#[get("/auth/student/me")]
#[tracing::instrument(skip_all)]
pub async fn student_me(student: StudentAuth) -> Json<Student> {
    Json(student.0)
}

/// End the student session
#[utoipa::path(responses((status = 200, description = "Session removed")))]
#[post("/auth/student/logout")]
#[tracing::instrument(skip_all)]
pub async fn student_logout(
    cookies: &CookieJar<'_>,
    db: &State<Database>,
) -> Result<Json<super::Message>, Problem> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE_NAME) {
        db.delete_session(cookie.value()).await?;
        cookies.remove(Cookie::from(SESSION_COOKIE_NAME));
    }

    Ok(Json(super::message("Logged out.")))
}
