//! Preflight Check System
//!
//! Verifies the environment before any work is accepted: directory tree
//! writable, configuration coherent, model cache reachable. The server
//! and the CLI both refuse to start when a critical check fails.

use crate::config::Settings;
use crate::fs_manager::PortablePathManager;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of a single check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
}

impl CheckResult {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
        }
    }
}

/// Complete preflight report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    pub all_passed: bool,
    pub checks: Vec<CheckResult>,
    pub ready_to_start: bool,
    pub summary: String,
}

/// Runs every check and assembles the report. Only critical checks gate
/// startup; the model-cache check is advisory since hf-hub downloads on
/// first use.
pub fn run_preflight_checks(settings: &Settings) -> PreflightReport {
    info!("Running preflight checks");

    let checks = vec![
        check_directories(),
        check_settings(settings),
        check_model_cache(settings),
    ];

    let all_passed = checks.iter().all(|c| c.passed);
    let ready_to_start = checks
        .iter()
        .filter(|c| is_critical_check(&c.name))
        .all(|c| c.passed);

    let summary = if all_passed {
        "All checks passed. System ready.".to_string()
    } else if ready_to_start {
        "Non-critical checks failed; starting anyway.".to_string()
    } else {
        let failed: Vec<&str> = checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        format!("Critical checks failed: {}", failed.join(", "))
    };

    for check in &checks {
        if check.passed {
            info!(check = %check.name, "{}", check.message);
        } else {
            warn!(check = %check.name, "{}", check.message);
        }
    }

    PreflightReport {
        all_passed,
        checks,
        ready_to_start,
        summary,
    }
}

fn is_critical_check(name: &str) -> bool {
    matches!(name, "directories" | "settings")
}

fn check_directories() -> CheckResult {
    match PortablePathManager::init() {
        Ok(()) => CheckResult::pass("directories", "Data, output, and log directories ready"),
        Err(e) => CheckResult::fail("directories", &format!("Cannot create directories: {}", e)),
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::pass(
            "settings",
            &format!(
                "{} models, {} intents configured",
                settings.models.len(),
                settings.allowed_intents.len()
            ),
        ),
        Err(e) => CheckResult::fail("settings", &format!("Settings invalid: {}", e)),
    }
}

fn check_model_cache(settings: &Settings) -> CheckResult {
    let models_dir = PortablePathManager::models_dir();
    if models_dir.exists() {
        CheckResult::pass(
            "model_cache",
            &format!(
                "Model cache at {:?} ({} models configured)",
                models_dir,
                settings.models.len()
            ),
        )
    } else {
        CheckResult::fail(
            "model_cache",
            "Model cache directory missing; models will be downloaded on first load",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_settings_block_startup() {
        let mut settings = Settings::default();
        settings.models.clear();
        let report = run_preflight_checks(&settings);
        assert!(!report.ready_to_start);
        assert!(report.summary.contains("settings"));
    }

    #[test]
    fn test_valid_settings_are_ready() {
        let report = run_preflight_checks(&Settings::default());
        assert!(report.ready_to_start);
    }
}
