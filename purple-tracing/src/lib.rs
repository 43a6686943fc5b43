//! Process-wide logging initialisation.
//!
//! The engine itself never configures a subscriber — that's a binary-level
//! decision — but the workspace keeps the initialisation code in its own
//! crate so every binary (and every test harness) sets it up the same way.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Default filter when `PURPLE_LOG` / `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Initialises the global `tracing` subscriber. Safe to call more than once
/// (e.g. from several integration tests) — only the first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("PURPLE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init();
    });
}
