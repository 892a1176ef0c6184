//! Tracing setup and the request tracing layer.

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "expense_tracker=debug,tower_http=info";

/// Install the global tracing subscriber.
///
/// The filter is read from `RUST_LOG` and falls back to [DEFAULT_FILTER].
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wrap `router` in a [TraceLayer] that opens one span per request.
pub fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Handlers log their own 5xx causes
        .on_failure(());

    router.layer(tracing_layer)
}
