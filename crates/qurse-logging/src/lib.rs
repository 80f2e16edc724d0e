// Logging module - request/response debugging for provider calls
pub mod request_logger;

use std::path::PathBuf;

use anyhow::{Context, Result};

pub use request_logger::{
    log_request, log_request_to_file, log_response, log_response_to_file, log_stream_chunk,
};

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = if max_chars >= 3 { max_chars - 3 } else { 0 };
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Verbose console debugging, toggled by the QURSE_VERBOSE env var
pub fn verbose_enabled() -> bool {
    std::env::var("QURSE_VERBOSE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Get or create the base qurse directory (~/.qurse)
pub fn get_qurse_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Failed to get home directory")?;

    let qurse_dir = PathBuf::from(home_dir).join(".qurse");

    if !qurse_dir.exists() {
        std::fs::create_dir_all(&qurse_dir).context("Failed to create qurse directory")?;
    }

    Ok(qurse_dir)
}

/// Get or create the logs directory (~/.qurse/logs)
pub fn get_logs_dir() -> Result<PathBuf> {
    let logs_dir = get_qurse_dir()?.join("logs");

    if !logs_dir.exists() {
        std::fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;
    }

    Ok(logs_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn truncate_short_string_is_identity() {
        assert_eq!(safe_truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string_appends_ellipsis() {
        assert_eq!(safe_truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_is_char_safe() {
        // Multi-byte characters must not be split
        let s = "héllo wörld";
        let truncated = safe_truncate(s, 8);
        assert_eq!(truncated, "héllo...");
    }

    #[test]
    #[serial]
    fn logs_dir_is_created_under_home() {
        let tmp = tempfile::tempdir().unwrap();
        let old_home = std::env::var("HOME").ok();
        std::env::set_var("HOME", tmp.path());

        let logs = get_logs_dir().unwrap();
        assert!(logs.ends_with(".qurse/logs"));
        assert!(logs.exists());

        match old_home {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
    }
}
