//! Logging setup for the backend service.
//!
//! JSON (Bunyan format) for machine ingestion or human-readable text,
//! selected by configuration. An HTTP trace layer attaches the method and
//! matched route to every log line emitted inside a request.

use axum::{extract::MatchedPath, http::Request};
use tower_http::trace::TraceLayer;
use tracing::info_span;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Initialize the tracing subscriber with the selected format.
pub fn initialize_logging(log_format: LogFormat) {
    let env_filter = EnvFilter::from_default_env();

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(
                    "notebook-hub-backend".to_string(),
                    std::io::stdout,
                ))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

/// Tracing layer that names request spans after the matched route pattern
/// rather than the raw URI, so path parameters do not explode log
/// cardinality.
pub fn create_http_trace_layer<B>() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    impl tower_http::trace::MakeSpan<B> + Clone,
> {
    TraceLayer::new_for_http().make_span_with(|request: &Request<B>| {
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str())
            .unwrap_or("unknown");

        info_span!(
            "http_request",
            method = %request.method(),
            endpoint = %matched_path,
        )
    })
}
