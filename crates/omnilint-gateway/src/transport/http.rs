//! `POST /api/validate` handler.
//!
//! The body is buffered by the [`Bytes`] extractor under the route's
//! `DefaultBodyLimit`; the pipeline decides what a failed read means. Status
//! codes come from the error's [`ClientCode`].

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tracing::Instrument;

use omnilint_core::error::ClientCode;

use crate::app_state::AppState;
use crate::context::RequestMeta;
use crate::pipeline;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let meta = RequestMeta::from_headers(&headers);
    let span = tracing::info_span!(
        "validate",
        request_id = %meta.request_id,
        client = %meta.client
    );

    let reply = pipeline::validate(&state, &meta, body).instrument(span).await;
    let status = reply.code.map(status_for).unwrap_or(StatusCode::OK);

    let mut resp = (status, Json(reply.body)).into_response();
    if let Ok(v) = HeaderValue::from_str(&meta.request_id) {
        resp.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), v);
    }
    resp
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ClientCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ClientCode::Busy => StatusCode::SERVICE_UNAVAILABLE,
        // Context and request-shape problems never leave the pipeline as
        // errors; anything that does is a failed call.
        ClientCode::BadRequest | ClientCode::InvalidContext | ClientCode::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
