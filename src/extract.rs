//! Request authentication and the mapping from access decisions to errors.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use verdict_authz::{Decision, Principal};
use verdict_http::AppError;

use crate::modules::users::{models::User, repo};
use crate::state::AppState;

const BEARER: &str = "Bearer ";

/// The caller, if a valid bearer token was presented.
///
/// A malformed, expired or forged token is rejected outright rather than
/// being treated as anonymous.
pub struct Caller(pub Option<User>);

impl Caller {
    pub fn principal(&self) -> Option<Principal> {
        self.0.as_ref().map(User::principal)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let Some(token) = bearer_token(parts) else {
            return Ok(Caller(None));
        };

        let claims = state.tokens.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "bearer token rejected");
            AppError::unauthorized(format!("invalid token: {err}"))
        })?;

        let user = repo::find_by_id(&state.db, claims.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("user for this token no longer exists"))?;
        Ok(Caller(Some(user)))
    }
}

/// An authenticated caller; anonymous requests are answered with 401.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Caller::from_request_parts(parts, state).await? {
            Caller(Some(user)) => Ok(AuthUser(user)),
            Caller(None) => Err(not_authenticated()),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn not_authenticated() -> AppError {
    AppError::unauthorized("authentication credentials were not provided")
}

/// Turn an access decision into a response error.
pub fn enforce(decision: Decision) -> Result<(), AppError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Unauthenticated => Err(not_authenticated()),
        Decision::Forbidden => Err(AppError::forbidden(
            "you do not have permission to perform this action",
        )),
    }
}
