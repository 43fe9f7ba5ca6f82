//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP client crates that are quieted unless debug logging is requested
const NOISY_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

/// Initialize tracing with a base level such as `INFO` or `debug`
///
/// `RUST_LOG` still wins when it is set.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}

/// Build filter directives for a base level
pub fn default_directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    let level = match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        "warning" => "warn".to_string(),
        "critical" => "error".to_string(),
        _ => "info".to_string(),
    };

    if level == "debug" || level == "trace" {
        return level;
    }

    let mut directives = vec![level];
    directives.extend(NOISY_CRATES.iter().map(|c| format!("{c}=warn")));
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_quiets_http_crates() {
        let d = default_directives("INFO");
        assert!(d.starts_with("info,"));
        assert!(d.contains("reqwest=warn"));
    }

    #[test]
    fn test_debug_keeps_everything() {
        assert_eq!(default_directives("DEBUG"), "debug");
    }

    #[test]
    fn test_python_style_levels() {
        assert!(default_directives("WARNING").starts_with("warn,"));
        assert!(default_directives("CRITICAL").starts_with("error,"));
        assert!(default_directives("bogus").starts_with("info,"));
    }
}
