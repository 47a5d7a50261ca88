//! Tracing subscriber setup for the CLI

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for a `-v` count. `RUST_LOG` takes precedence.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "bchmsg=warn,bch_msg_wallet=warn",
        1 => "bchmsg=info,bch_msg_wallet=info",
        _ => "bchmsg=debug,bch_msg_wallet=debug",
    }
}

/// Installs a stderr fmt layer. Calling it twice is a no-op.
pub fn init_logging(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(verbosity).into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
