use std::time::{Duration, Instant};

use tracing::info_span;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "classweave=info,warn";
const QUIET_FILTER: &str = "error";

/// Initialize logging facade with stderr output. `RUST_LOG` wins over both defaults.
pub fn init_logging(quiet: bool) {
    let fallback = if quiet { QUIET_FILTER } else { DEFAULT_FILTER };
    let init_result = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    let _ = init_result;
}

/// Runs `f` inside a `phase` span tagged with `name` and measures it.
pub fn in_phase<T, F>(name: &'static str, f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let span = info_span!("phase", phase = name);
    let started_at = Instant::now();
    let value = span.in_scope(f);
    (value, started_at.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_phase_returns_closure_value() {
        let (value, duration) = in_phase("test", || 40 + 2);
        assert_eq!(value, 42);
        assert!(duration <= Duration::from_secs(60));
    }

    #[test]
    fn init_logging_tolerates_repeated_calls() {
        init_logging(true);
        init_logging(false);
    }
}
