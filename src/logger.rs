//! `tracing` subscriber initialization: a stderr `fmt` layer behind a
//! shared `EnvFilter`.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Initializes the global `tracing` subscriber: a stderr `fmt` layer
/// filtered by `RUST_LOG`, or `gatesim=debug` when `--verbose` is set and
/// `RUST_LOG` is unset.
pub fn init_tracing(cfg: &Config) {
    let default_filter = if cfg.verbose { "gatesim=debug" } else { "gatesim=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(cfg.verbose).with_level(true);

    tracing_subscriber::registry().with(fmt_layer).with(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = option_env!("VERGEN_GIT_SHA_SHORT").unwrap_or("unknown"),
        "gatesim starting"
    );
    info!(
        path = %cfg.path.display(),
        cycles = cfg.cycles,
        stats_json = cfg.stats_json,
        verbose = cfg.verbose,
        "configuration loaded"
    );
}
