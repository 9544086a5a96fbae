use axum::extract::{ConnectInfo, Request};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{error, info};

/// One line per request, written once the response is ready:
/// `<ip> "<METHOD> <path> <proto>" <status> <elapsed>`.
///
/// The line goes out when the handler returns, before the body is streamed,
/// so `elapsed` does not include writing the body to the caller.
pub async fn access_log(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let version = request.version();

    let response = next.run(request).await;

    info!(
        "{} \"{} {} {:?}\" {} {:?}",
        peer.ip(),
        method,
        path,
        version,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!("Request handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Internal Server Error",
    )
        .into_response()
}
