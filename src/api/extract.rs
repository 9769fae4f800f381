use axum::Json;
use axum::extract::{FromRequest, Request, rejection::JsonRejection};

use super::error::ApiError;

/// `Json` extractor whose rejection is rendered as an [`ApiError`], so a
/// missing or malformed body gets the same `{success:false, message}` shape
/// as any other client error.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
