use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::Database;
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::util::date_time_as_unix_seconds;
use crate::config::Config;
use crate::data::user::db::UserDbExt;
use crate::data::user::User;
use crate::resp::problem::Problem;
use crate::role::Role;

/// Claims carried by the teacher/admin bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthToken {
    pub fn new(user: &User, expiry_hours: i64) -> AuthToken {
        let now = Utc::now();
        AuthToken {
            iat: now,
            exp: now + Duration::hours(expiry_hours),
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(secret.as_ref());

        encode(&header, &self, &key)
    }

    pub fn decode_jwt(token: &str, secret: impl AsRef<[u8]>) -> Result<AuthToken, Problem> {
        decode::<AuthToken>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(Problem::from)
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

/// Token from the `Authorization: Bearer` header, if the header is present
/// and well formed.
pub fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|it| it.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|it| !it.is_empty())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config: &Config = req.rocket().state().unwrap();

        let token = match bearer_token(req) {
            Some(it) => it,
            None => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    auth_problem("Missing bearer token."),
                ));
            }
        };

        match AuthToken::decode_jwt(token, &config.jwt_secret) {
            Ok(claims) => {
                tracing::debug!("decoded auth token for user: {}", claims.sub);
                request::Outcome::Success(claims)
            }
            Err(e) => request::Outcome::Error((Status::Unauthorized, e)),
        }
    }
}

/// A teacher or admin resolved against the user collection on every request,
/// matching the token's subject.
#[derive(Debug)]
pub struct AuthedUser(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthedUser {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let claims = match req.guard::<AuthToken>().await {
            request::Outcome::Success(it) => it,
            request::Outcome::Error(e) => return request::Outcome::Error(e),
            request::Outcome::Forward(f) => return request::Outcome::Forward(f),
        };

        let db: &Database = req.rocket().state().unwrap();
        let user = match db.get_user(claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    auth_problem("User not found."),
                ));
            }
            Err(e) => return request::Outcome::Error((Status::InternalServerError, e)),
        };

        if !user.is_active {
            return request::Outcome::Error((
                Status::Forbidden,
                crate::resp::problem::forbidden("Account is deactivated."),
            ));
        }

        request::Outcome::Success(AuthedUser(user))
    }
}

/// [`AuthedUser`] further restricted to the admin role.
#[derive(Debug)]
pub struct AdminUser(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let user = match req.guard::<AuthedUser>().await {
            request::Outcome::Success(AuthedUser(user)) => user,
            request::Outcome::Error(e) => return request::Outcome::Error(e),
            request::Outcome::Forward(f) => return request::Outcome::Forward(f),
        };

        if !user.role.is_admin() {
            return request::Outcome::Error((
                Status::Forbidden,
                crate::resp::problem::forbidden("Admin access required."),
            ));
        }

        request::Outcome::Success(AdminUser(user))
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl Into<SecurityScheme> for JWTAuth {
        fn into(self) -> SecurityScheme {
            let mut http = Http::new(HttpAuthScheme::Bearer);
            http.bearer_format = Some("JWT".to_string());
            http.scheme = HttpAuthScheme::Bearer;
            SecurityScheme::Http(http)
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            let c = openapi.components.as_mut().unwrap();
            c.add_security_scheme("jwt", *self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    #[test]
    fn jwt_round_trips_through_hs256() {
        let mut now = Utc::now();
        now = now.round_subsecs(0);

        let sub = Uuid::new_v4();

        let token = AuthToken {
            iat: now,
            exp: now + Duration::hours(24),
            sub,
            email: "teacher@example.com".to_string(),
            role: Role::Admin,
        };

        let secret = "test_secret";
        let encoded = token
            .encode_jwt(secret)
            .expect("encoding should work for example");

        let decoded = AuthToken::decode_jwt(&encoded, secret).expect("unable to decode token");

        assert_eq!(now, decoded.iat);
        assert_eq!(now + Duration::hours(24), decoded.exp);
        assert_eq!(sub, decoded.sub);
        assert_eq!(decoded.email, "teacher@example.com");
        assert_eq!(decoded.role, Role::Admin);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let user_token = AuthToken {
            iat: Utc::now(),
            exp: Utc::now() + Duration::hours(1),
            sub: Uuid::new_v4(),
            email: "teacher@example.com".to_string(),
            role: Role::Teacher,
        };

        let encoded = user_token.encode_jwt("secret_a").unwrap();
        assert!(AuthToken::decode_jwt(&encoded, "secret_b").is_err());
    }

    #[test]
    fn jwt_rejects_expired_token() {
        let user_token = AuthToken {
            iat: Utc::now() - Duration::hours(48),
            exp: Utc::now() - Duration::hours(24),
            sub: Uuid::new_v4(),
            email: "teacher@example.com".to_string(),
            role: Role::Teacher,
        };

        let encoded = user_token.encode_jwt("secret").unwrap();
        let err = AuthToken::decode_jwt(&encoded, "secret").unwrap_err();
        assert_eq!(err.status, Status::Unauthorized);
    }
}
