use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber. `RUST_LOG` overrides the default `shiv_budget=info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("shiv_budget=info,tower_http=info"));

        // Logs go to stderr so CLI output on stdout stays clean
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    });
}
