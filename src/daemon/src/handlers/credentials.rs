use crate::state::ProxyState;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use mesos2iam_common::ResolutionError;
use std::net::SocketAddr;
use tracing::{debug, error};

pub const CREDENTIALS_ENDPOINT: &str = mesos2iam_common::constants::CREDENTIALS_ENDPOINT;

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Resolves the caller's job id from its source address and relays the
/// backend's answer for that job. Nothing from the request itself is trusted.
pub async fn credentials(
    State(state): State<ProxyState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let job_id = match state.resolver().resolve(peer).await {
        Ok(job_id) => job_id,
        Err(err) => {
            error!(
                peer = %peer,
                stage = err.stage(),
                "Error getting JobId from http request: {}",
                err
            );
            return resolution_failure(&err);
        }
    };
    debug!("JobId {} found for {}", job_id, peer);

    match state.backend().fetch(&job_id).await {
        Ok(credentials) => {
            let content_type = credentials
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type)],
                credentials.body,
            )
                .into_response()
        }
        Err(err) => {
            error!(
                job_id = %job_id,
                "Couldn't get credentials from backend: {:?}",
                err
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Couldn't get credentials from backend: {err}"),
            )
                .into_response()
        }
    }
}

/// Only a malformed job id is echoed back. Every other failure gets the same
/// body so callers learn nothing about the host.
fn resolution_failure(err: &ResolutionError) -> Response {
    let body = match err {
        ResolutionError::InvalidIdentity(value) => {
            format!("Invalid JobId in http request: {value}")
        }
        _ => "Error getting JobId from http request: identity not found".to_string(),
    };
    (StatusCode::BAD_REQUEST, body).into_response()
}
