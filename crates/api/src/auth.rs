use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::routes::ApiState;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "devpulse_session";

/// Cookie value: `username.base64url(HMAC-SHA256(secret, username))`.
pub fn sign(secret: &str, username: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(username.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{username}.{signature}")
}

/// Recompute the signature and compare. Returns the username on success.
pub fn verify(secret: &str, value: &str) -> Option<String> {
    let (username, signature) = value.rsplit_once('.')?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(username.as_bytes());
    let provided = URL_SAFE_NO_PAD.decode(signature.as_bytes()).ok()?;
    mac.verify_slice(&provided).ok()?;
    Some(username.to_string())
}

fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

pub async fn require_auth(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let authed = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, COOKIE_NAME))
        .and_then(|value| verify(&state.cookie_secret, value));
    match authed {
        Some(_) => next.run(request).await,
        None => ApiError::Unauthorized.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Response> {
    let valid = state
        .credentials
        .get(&request.username)
        .map_or(false, |password| *password == request.password);
    if !valid {
        return Err(ApiError::Unauthorized);
    }

    info!(username = %request.username, "login");
    let cookie = format!(
        "{COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax",
        sign(&state.cookie_secret, &request.username)
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "username": request.username })),
    )
        .into_response())
}

pub async fn logout() -> Response {
    let cookie = format!("{COOKIE_NAME}=; Path=/; HttpOnly; Max-Age=0");
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "status": "ok" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_a_signed_value() {
        let value = sign("secret", "alice");
        assert_eq!(verify("secret", &value), Some("alice".to_string()));
    }

    #[test]
    fn verify_rejects_a_tampered_username() {
        let value = sign("secret", "alice");
        let forged = value.replacen("alice", "admin", 1);
        assert_eq!(verify("secret", &forged), None);
    }

    #[test]
    fn verify_rejects_a_different_secret() {
        let value = sign("secret", "alice");
        assert_eq!(verify("other", &value), None);
    }

    #[test]
    fn verify_rejects_malformed_values() {
        assert_eq!(verify("secret", "no-dot-here"), None);
        assert_eq!(verify("secret", "alice.not!base64url"), None);
    }

    #[test]
    fn cookie_value_picks_the_named_cookie() {
        let cookies = "theme=dark; devpulse_session=abc.def; lang=en";
        assert_eq!(cookie_value(cookies, COOKIE_NAME), Some("abc.def"));
        assert_eq!(cookie_value(cookies, "missing"), None);
    }
}
