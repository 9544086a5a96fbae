use crate::handlers::credentials::{credentials, CREDENTIALS_ENDPOINT};
use crate::state::ProxyState;
use axum::routing::{get, MethodRouter};
use std::sync::LazyLock;

pub(crate) static ROUTES: LazyLock<Vec<(&'static str, MethodRouter<ProxyState>)>> =
    LazyLock::new(|| vec![(CREDENTIALS_ENDPOINT, get(credentials))]);
