use crate::access_log::{access_log, panic_response};
use crate::routes::ROUTES;
use crate::state::ProxyState;
use axum::middleware;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

pub fn get_app(state: ProxyState) -> Router {
    let mut router = Router::new();
    for (path, method_router) in ROUTES.iter() {
        router = router.route(path, method_router.clone());
    }
    with_layers(router.with_state(state))
}

/// A panicking handler answers 500 and the listener keeps serving. The access
/// log sits outside so those requests are logged too.
pub fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(access_log))
}
