//! Run results: per-case outcomes, summary logging and the JSON report file

use art_shared::{redact, ArtError, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    /// An assertion did not hold
    Failed,
    /// Anything other than an assertion went wrong
    Error,
    Skipped,
}

impl Outcome {
    pub fn of(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Passed,
            Err(e) if e.is_assertion() => Outcome::Failed,
            Err(_) => Outcome::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub suite: String,
    pub case: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    pub results: Vec<CaseResult>,
    /// Setup, teardown and environment failures outside any case
    pub errors: Vec<String>,
    pub summary: Summary,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            engine_version: None,
            results: Vec::new(),
            errors: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn record(
        &mut self,
        suite: &str,
        case: &str,
        outcome: Outcome,
        duration: Duration,
        message: Option<String>,
    ) {
        let message = message.map(|m| redact(&m));
        match outcome {
            Outcome::Passed => info!("PASSED {}::{} ({:?})", suite, case, duration),
            Outcome::Skipped => info!(
                "SKIPPED {}::{}: {}",
                suite,
                case,
                message.as_deref().unwrap_or("")
            ),
            Outcome::Failed | Outcome::Error => error!(
                "{} {}::{} ({:?}): {}",
                if outcome == Outcome::Failed { "FAILED" } else { "ERROR" },
                suite,
                case,
                duration,
                message.as_deref().unwrap_or("")
            ),
        }
        self.results.push(CaseResult {
            suite: suite.to_string(),
            case: case.to_string(),
            outcome,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            message,
        });
    }

    /// Record the result of running a case
    pub fn record_result(&mut self, suite: &str, case: &str, result: &Result<()>, duration: Duration) {
        let message = result.as_ref().err().map(ArtError::to_string);
        self.record(suite, case, Outcome::of(result), duration, message);
    }

    /// Record a failure that belongs to no single case
    pub fn record_error(&mut self, context: &str, error: &ArtError) {
        let message = redact(&format!("{context}: {error}"));
        error!("{}", message);
        self.errors.push(message);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.summary = self.results.iter().fold(Summary::default(), |mut s, r| {
            s.total += 1;
            match r.outcome {
                Outcome::Passed => s.passed += 1,
                Outcome::Failed => s.failed += 1,
                Outcome::Error => s.errors += 1,
                Outcome::Skipped => s.skipped += 1,
            }
            s
        });
    }

    /// No failed or errored case and no failure outside the cases
    pub fn all_passed(&self) -> bool {
        self.errors.is_empty()
            && self
                .results
                .iter()
                .all(|r| matches!(r.outcome, Outcome::Passed | Outcome::Skipped))
    }

    pub fn summary_line(&self) -> String {
        let s = &self.summary;
        format!(
            "{} cases: {} passed, {} failed, {} errors, {} skipped",
            s.total, s.passed, s.failed, s.errors, s.skipped
        )
    }

    pub fn log_summary(&self) {
        let line = self.summary_line();
        if self.all_passed() {
            info!("{}", line);
        } else {
            warn!("{}", line);
            for message in &self.errors {
                warn!("  {}", message);
            }
        }
    }

    /// Write the report as `art-report-<timestamp>.json` into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "art-report-{}.json",
            self.started_at.format("%Y%m%d-%H%M%S")
        ));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Where reports go when the configuration names no directory
pub fn default_results_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "art", "art").map(|dirs| dirs.data_dir().join("results"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(Outcome::of(&Ok(())), Outcome::Passed);
        assert_eq!(
            Outcome::of(&Err(ArtError::Assertion("vm is down".to_string()))),
            Outcome::Failed
        );
        assert_eq!(
            Outcome::of(&Err(ArtError::Vm("Failed to start VM vm_0".to_string()))),
            Outcome::Error
        );
    }

    #[test]
    fn test_summary_and_exit_decision() {
        let mut report = RunReport::new();
        report.record("snapshots", "create_snapshot", Outcome::Passed, Duration::from_millis(5), None);
        report.record("cpu_memory", "hotplug_cpu", Outcome::Skipped, Duration::ZERO, None);
        report.finish();
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.skipped, 1);
        assert!(report.all_passed());

        report.record_result(
            "snapshots",
            "restore_snapshot",
            &Err(ArtError::Assertion("VM art_vm is up after restore".to_string())),
            Duration::from_millis(7),
        );
        report.finish();
        assert_eq!(report.summary.failed, 1);
        assert!(!report.all_passed());
        assert_eq!(
            report.summary_line(),
            "3 cases: 1 passed, 1 failed, 0 errors, 1 skipped"
        );
    }

    #[test]
    fn test_errors_outside_cases_fail_the_run() {
        let mut report = RunReport::new();
        report.record_error("Setup of datacenter", &ArtError::Config("no hosts".to_string()));
        report.finish();
        assert!(!report.all_passed());
        assert_eq!(report.errors, vec!["Setup of datacenter: Configuration error: no hosts"]);
    }

    #[test]
    fn test_recorded_messages_are_redacted() {
        let mut report = RunReport::new();
        report.record_result(
            "networks",
            "host_nic_attachment",
            &Err(ArtError::Host(r#"Failed to add host h0: {"root_password": "hunter2"}"#.to_string())),
            Duration::ZERO,
        );
        report.record_error("Environment setup", &ArtError::Auth("Bearer abc.def rejected".to_string()));
        let message = report.results[0].message.as_deref().unwrap();
        assert!(!message.contains("hunter2"));
        assert!(!report.errors[0].contains("abc.def"));
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let mut report = RunReport::new();
        report.engine_version = Some("4.5.4".to_string());
        report.record("migration", "migrate_back", Outcome::Error, Duration::from_secs(1), Some("boom".into()));
        report.finish();

        let path = report.write_to(&dir.path().join("results")).unwrap();
        let written: RunReport =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.results.len(), 1);
        assert_eq!(written.results[0].outcome, Outcome::Error);
        assert_eq!(written.summary.errors, 1);
    }
}
