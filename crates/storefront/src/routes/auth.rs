//! Signup and signin handlers.
//!
//! Both answer `{success: true, token}` on success. Failures use the
//! `{success: false, error}` shape; a wrong password is a normal 200 answer.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::services::auth::{AuthError, Signup};
use crate::state::AppState;

/// Accept the phone as a JSON number or a string.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    #[serde(alias = "username")]
    pub name: String,
    pub email: String,
    #[serde(deserialize_with = "string_or_number")]
    pub phone: String,
    #[serde(default)]
    pub gender: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninBody {
    pub email: String,
    pub password: String,
}

fn auth_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(body)| body)
        .map_err(|rejection| AuthError::InvalidInput(rejection.body_text()).into())
}

/// `POST /signup`
#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: std::result::Result<Json<SignupBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let body = auth_body(body)?;
    let (user, token) = state
        .auth()
        .signup(Signup {
            name: body.name,
            email: body.email,
            phone: body.phone,
            gender: body.gender,
            password: body.password,
        })
        .await?;

    add_breadcrumb("auth", "Signed up", Some(&[("user_id", &user.id.to_string())]));
    Ok(Json(json!({ "success": true, "token": token })))
}

/// `POST /signin`
#[instrument(skip(state, body))]
pub async fn signin(
    State(state): State<AppState>,
    body: std::result::Result<Json<SigninBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let body = auth_body(body)?;
    let (user, token) = state.auth().signin(&body.email, &body.password).await?;

    add_breadcrumb("auth", "Signed in", Some(&[("user_id", &user.id.to_string())]));
    Ok(Json(json!({ "success": true, "token": token })))
}
