//! Runtime middleware, e.g. catch panics.

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body::Full;
use std::any::Any;

/// Convert a runtime panic into a 500 response in the same JSON API shape
/// as [crate::error::AppError], without tearing down the connection.
pub fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response<Full<Bytes>> {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };

    tracing::error!(%details, "Request handler panicked");

    let body = serde_json::json!({
        "errors": [{
            "status": "500",
            "kind": "internal",
            "title": "Internal Server Error",
        }]
    });

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Full::from(body.to_string()))
        .expect("building a static response can't fail")
}
