//! Extractors that report rejections in the common error format.

use std::{convert::Infallible, marker::PhantomData};

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use garde::Validate;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body deserialized and then checked against its `garde` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Validate + Send,
    T::Context: Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// JSON body whose parsing and validation wait until [`Deferred::into_valid`].
///
/// Guarded writes take this so that an access decision made in the handler
/// is reported before anything about the body.
#[derive(Debug)]
pub struct Deferred<T> {
    body: Result<serde_json::Value, AppError>,
    target: PhantomData<fn() -> T>,
}

impl<T> Deferred<T>
where
    T: DeserializeOwned + Validate,
    T::Context: Default,
{
    pub fn into_valid(self) -> Result<T, AppError> {
        let value: T = serde_json::from_value(self.body?)
            .map_err(|err| AppError::invalid_field("body", err.to_string()))?;
        value.validate()?;
        Ok(value)
    }
}

impl<S, T> FromRequest<S> for Deferred<T>
where
    T: Send,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map(|Json(value)| value)
            .map_err(AppError::from);
        Ok(Self {
            body,
            target: PhantomData,
        })
    }
}

/// Query string parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters; a segment that fails to parse is reported as 404.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
