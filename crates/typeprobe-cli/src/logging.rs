//! Diagnostics for typeprobe runs.
//!
//! The engine crates only emit `tracing` events: matrix cells and memo hits
//! at DEBUG, individual resolutions at TRACE. This module decides which of
//! them reach stderr. stdout carries the analysis alone.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding extra filter directives.
pub const LOG_ENV: &str = "TYPEPROBE_LOG";

/// Crates whose events `-v` turns up.
const ENGINE_TARGETS: &[&str] = &["typeprobe_core", "typeprobe_cli"];

/// Filter directives for a `-v` count.
///
/// Quiet runs only show warnings, so a clean check prints nothing but its
/// report. `-v` shows the matrix and memo decisions; `-vv` adds every
/// resolution trace. Other crates stay at `warn`.
fn directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let mut out = String::from("warn");
    for target in ENGINE_TARGETS {
        out.push(',');
        out.push_str(target);
        out.push('=');
        out.push_str(level);
    }
    out
}

/// Install the global subscriber. `TYPEPROBE_LOG` directives, when set,
/// are applied after the verbosity defaults and win over them.
pub fn init(verbosity: u8, json: bool) {
    let mut spec = directives(verbosity);
    if let Ok(extra) = std::env::var(LOG_ENV) {
        if !extra.trim().is_empty() {
            spec.push(',');
            spec.push_str(extra.trim());
        }
    }
    let filter = EnvFilter::try_new(&spec).unwrap_or_else(|_| EnvFilter::new(directives(verbosity)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        // One object per event; the `check` span carries the package dir.
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(verbosity > 1)
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_run_keeps_engine_at_warn() {
        assert_eq!(directives(0), "warn,typeprobe_core=warn,typeprobe_cli=warn");
    }

    #[test]
    fn test_verbosity_raises_only_engine_targets() {
        assert_eq!(directives(1), "warn,typeprobe_core=debug,typeprobe_cli=debug");
        assert_eq!(directives(5), "warn,typeprobe_core=trace,typeprobe_cli=trace");
    }

    #[test]
    fn test_directives_parse() {
        for verbosity in 0..3 {
            assert!(EnvFilter::try_new(directives(verbosity)).is_ok());
        }
    }
}
