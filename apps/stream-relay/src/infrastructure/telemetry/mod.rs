//! Tracing Initialization
//!
//! Configures structured logging for the worker. Log level comes from
//! `RUST_LOG` when set, otherwise from the relay debug flag.
//!
//! # Usage
//!
//! ```ignore
//! use polygon_stream_relay::infrastructure::telemetry;
//!
//! telemetry::init(false);
//! tracing::info!("worker starting");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// `debug` lowers the worker's default level to `debug`; dependency
/// crates stay at their own defaults unless `RUST_LOG` overrides them.
#[allow(clippy::expect_used)]
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn")
            .add_directive(
                format!("polygon_stream_relay={default_level}")
                    .parse()
                    .expect("worker level directive is valid"),
            )
            .add_directive("hyper=warn".parse().expect("static directive is valid"))
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
