use super::state::ServerState;
use crate::user::{AuthTokenValue, User};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{debug, error};

#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    AccessDenied,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
            SessionExtractionError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    <CookieJar as FromRequestParts<ServerState>>::from_request_parts(parts, ctx)
        .await
        .ok()?
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    let raw = parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(&raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Result<Option<Session>, SessionExtractionError> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return Ok(None);
        }
        Some(x) => x,
    };

    match ctx
        .user_manager
        .resolve_session(&AuthTokenValue(token.clone()))
    {
        Ok(Some(user)) => {
            debug!("Resolved session of user_id={}", user.id);
            Ok(Some(Session { user, token }))
        }
        Ok(None) => {
            debug!("Auth token not found in database");
            Ok(None)
        }
        Err(err) => {
            error!("Failed to resolve session: {:#}", err);
            Err(SessionExtractionError::InternalError)
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await?
            .ok_or(SessionExtractionError::AccessDenied)
    }
}
