//! Axum integration.
//!
//! The engine runs as a `from_fn_with_state` middleware in front of the rest
//! of the router: matched requests are forwarded, everything else continues
//! to the inner routes (static files, a 404 fallback, ...).
//!
//! ```no_run
//! # use axum::{Router, middleware, routing::get};
//! # use switchyard::{ForwardingEngine, adapters::forward_middleware};
//! # fn wire(engine: ForwardingEngine) -> Router {
//! Router::new()
//!     .route("/local", get(|| async { "served locally" }))
//!     .layer(middleware::from_fn_with_state(engine, forward_middleware))
//! # }
//! ```
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::core::{ForwardError, ForwardingEngine};

/// Non-standard status used when the caller hung up before we answered.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Run the forwarding engine, continuing to `next` when no rule matches.
pub async fn forward_middleware(
    State(engine): State<ForwardingEngine>,
    request: Request,
    next: Next,
) -> Response {
    match engine.handle(request, |request| next.run(request)).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        match self {
            ForwardError::Cancelled => {
                tracing::debug!("Caller disconnected before the backend answered");
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::BAD_REQUEST)
                    .into_response()
            }
            error => {
                tracing::error!(%error, "Request forwarding failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
