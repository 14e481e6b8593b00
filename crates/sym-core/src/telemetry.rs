//! Log output for the `sym` binary.
//!
//! Everything is written to stderr; stdout carries only the validation
//! report so `sym validate --json | jq` keeps working with logging enabled.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// HTTP stack crates that are chatty at debug level.
const QUIET_TARGETS: &[&str] = &["hyper", "h2", "reqwest", "rustls"];

/// Filter used when `RUST_LOG` is unset: `level` for our crates, `warn`
/// for the HTTP stack.
fn default_directives(level: Level) -> String {
    let mut directives = level.as_str().to_ascii_lowercase();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

/// Install the global subscriber. Only the first call in a process has
/// any effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let output = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output: Box<dyn Layer<Registry> + Send + Sync> = if json {
        output.json().boxed()
    } else {
        output.compact().boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init();
}
