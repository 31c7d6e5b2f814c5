use std::process::ExitCode;

use vectra_lib::config::AppConfig;
use vectra_lib::logging;

fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from this file, so report directly.
            eprintln!("vectra-server: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry before anything else so startup failures are captured.
    // Returns a no-op guard when no DSN is configured (local dev).
    let _sentry_guard = sentry::init(sentry_options(config.sentry_dsn.as_deref()));
    logging::init(config.log_json);

    match vectra_lib::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind(), "Server exited with error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn sentry_options(dsn: Option<&str>) -> sentry::ClientOptions {
    sentry::ClientOptions {
        dsn: dsn.and_then(|s| s.parse().ok()),
        release: Some(env!("CARGO_PKG_VERSION").into()),
        traces_sample_rate: 0.0,
        send_default_pii: false,
        auto_session_tracking: true,
        session_mode: sentry::SessionMode::Request,
        // Prompts and emails are user content; never ship them.
        before_send: Some(std::sync::Arc::new(|mut event| {
            if let Some(ref mut user) = event.user {
                user.email = None;
                user.ip_address = None;
                user.username = None;
            }
            if let Some(ref mut request) = event.request {
                request.data = None;
                request.headers.remove("x-user-id");
            }
            Some(event)
        })),
        ..Default::default()
    }
}
