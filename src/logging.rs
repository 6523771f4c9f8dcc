//! Structured engine diagnostics
//!
//! Every event is a short message followed by a JSON payload, routed
//! through the `log` facade. The CLI installs `env_logger` as the backend;
//! an embedding host may install its own.

use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::json;

use crate::constants::LOG_TARGET;
use crate::models::Phase;

/// Verbosity of one load's diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

/// Logger handed to every variant, hack and guard for one load
#[derive(Debug, Clone)]
pub struct EngineLogger {
    level: LogLevel,
}

impl EngineLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Debug level when the preferences ask for it, info otherwise
    pub fn for_debug_flag(debug: bool) -> Self {
        Self::new(if debug { LogLevel::Debug } else { LogLevel::Info })
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn log_phase_start(&self, phase: Phase, package: &str) {
        let data = json!({
            "event": "phase_start",
            "phase": phase,
            "package": package,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.log_structured(LogLevel::Debug, &format!("{} phase for {}", phase, package), &data);
    }

    pub fn log_variant_ok(&self, phase: Phase, variant: &str) {
        let data = json!({
            "event": "variant_ok",
            "phase": phase,
            "variant": variant,
        });
        self.log_structured(LogLevel::Info, &format!("  {}: [OK]", variant), &data);
    }

    pub fn log_variant_failed(&self, phase: Phase, variant: &str, cause: &str) {
        let data = json!({
            "event": "variant_failed",
            "phase": phase,
            "variant": variant,
            "cause": cause,
        });
        self.log_structured(LogLevel::Info, &format!("  {}: [!!] {}", variant, cause), &data);
    }

    pub fn log_variant_exhausted(&self, phase: Phase, attempts: usize) {
        let data = json!({
            "event": "variant_exhausted",
            "phase": phase,
            "attempts": attempts,
        });
        self.log_structured(LogLevel::Info, "No variant installed", &data);
    }

    pub fn log_hack_failed(&self, phase: Phase, hack: &str, cause: &str) {
        let data = json!({
            "event": "hack_failed",
            "phase": phase,
            "hack": hack,
            "cause": cause,
        });
        self.log_structured(LogLevel::Error, &format!("{}: [!!]", hack), &data);
    }

    pub fn log_hack_skipped(&self, hack: &str, reason: &str) {
        let data = json!({
            "event": "hack_skipped",
            "hack": hack,
            "reason": reason,
        });
        self.log_structured(LogLevel::Debug, &format!("{}: skipped", hack), &data);
    }

    pub fn log_bind_retry(&self, method: &str, class: &str) {
        let data = json!({
            "event": "bind_retry",
            "method": method,
            "class": class,
        });
        self.log_structured(LogLevel::Debug, &format!("bind_recursive: trying {}", class), &data);
    }

    pub fn log_guard_skip(&self, stage: &str, receiver: &str, target: Option<&str>) {
        let data = json!({
            "event": "guard_skip",
            "stage": stage,
            "receiver": receiver,
            "target": target,
        });
        self.log_structured(LogLevel::Debug, &format!("Skipping {} with this={}", stage, receiver), &data);
    }

    fn log_structured(&self, level: LogLevel, message: &str, data: &serde_json::Value) {
        if level > self.level {
            return;
        }

        let full_message = format!("{} | {}", message, data);

        match level {
            LogLevel::Error => error!(target: LOG_TARGET, "{}", full_message),
            LogLevel::Info => info!(target: LOG_TARGET, "{}", full_message),
            LogLevel::Debug => debug!(target: LOG_TARGET, "{}", full_message),
        }
    }
}

impl Default for EngineLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

/// Install `env_logger` on stderr for the CLI binary
pub fn init_cli_logger(verbose: bool) -> Result<()> {
    let filter = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .try_init()
        .map_err(|e| {
            warn!("logger already installed: {}", e);
            anyhow::anyhow!("Failed to set logger: {}", e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    fn test_debug_flag_selects_level() {
        assert_eq!(EngineLogger::for_debug_flag(true).level(), LogLevel::Debug);
        assert_eq!(EngineLogger::for_debug_flag(false).level(), LogLevel::Info);
    }
}
