//! JSON HTTP API over the session store.
//!
//! Every response carries a `success` flag; failures add a human-readable
//! `message` (see [`ApiError`]).

pub mod error;
pub mod extract;
pub mod routes;

pub use error::ApiError;
pub use extract::JsonBody;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    routes::build_router()
}
