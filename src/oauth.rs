//! Upstream OAuth session exchange for student sign-in.

use rocket::http::Status;
use serde::Deserialize;

use crate::resp::problem::Problem;

/// Identity payload returned by the session endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OauthSessionData {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub session_token: String,
}

/// Exchanges the frontend's one-time session id for the student's identity.
/// Any non-success upstream response maps to a 401.
pub async fn fetch_session_data(
    http: &reqwest::Client,
    url: &str,
    session_id: &str,
) -> Result<OauthSessionData, Problem> {
    let response = http
        .get(url)
        .header("X-Session-ID", session_id)
        .send()
        .await
        .map_err(Problem::from)?;

    if !response.status().is_success() {
        return Err(Problem::new_untyped(Status::Unauthorized, "Invalid session."));
    }

    response.json().await.map_err(Problem::from)
}
