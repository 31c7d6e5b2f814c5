use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with a stdout layer and a Sentry layer.
///
/// - Stdout: compact human-readable lines, or JSON lines when `json` is set
/// - Sentry: captures ERROR events as issues, WARN as breadcrumbs
/// - Default level: INFO (debug for this crate), override via RUST_LOG env
pub fn init(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vectra_lib=debug,vectra_server=debug"));

    // Routes existing tracing::error!/warn! calls to Sentry automatically.
    // No-op when Sentry DSN is not configured.
    let sentry_layer = sentry_tracing::layer().event_filter(|meta| match *meta.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    let registry = tracing_subscriber::registry().with(env_filter).with(sentry_layer);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }

    tracing::debug!(json, "Tracing initialized");
}
