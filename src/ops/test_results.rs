//! Running test suites and reading their summaries.
//!
//! The lit runner prints a summary such as
//!
//! ```text
//! Testing Time: 312.45s
//!   Passed    : 9876
//!   Failed    : 3
//! ```
//!
//! The failure count comes from the `Failed` line. A run without failures
//! has no such line, so the `Passed` line is accepted as proof of zero
//! failures. Output with neither line is never taken as success.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::builder::cmake::BuildDriver;
use crate::core::artifacts::TestTargetSet;
use crate::core::errors::{ConfigError, VerificationError};

static FAILED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*Failed[ \t]*:[ \t]*([0-9]+)").expect("valid regex")
});

static PASSED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*Passed[ \t]*:[ \t]*([0-9]+)").expect("valid regex")
});

/// Counts read from one suite's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    /// `None` when the output only reported failures
    pub passed: Option<u64>,
    pub failed: u64,
}

/// Extracts a result from test-runner output.
pub trait ResultParser {
    fn parse(&self, target: &str, output: &str) -> Result<TestOutcome, ConfigError>;
}

/// Reads the `Failed : N` / `Passed : N` summary lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryLineParser;

impl ResultParser for SummaryLineParser {
    fn parse(&self, target: &str, output: &str) -> Result<TestOutcome, ConfigError> {
        let unparseable = || ConfigError::UnparseableTestOutput {
            target: target.to_string(),
        };
        // A matched line whose count does not fit is unreadable, not absent.
        let capture = |re: &Regex| -> Result<Option<u64>, ConfigError> {
            match re.captures(output).and_then(|caps| caps.get(1)) {
                Some(m) => m.as_str().parse().map(Some).map_err(|_| unparseable()),
                None => Ok(None),
            }
        };

        let failed = capture(&FAILED_LINE)?;
        let passed = capture(&PASSED_LINE)?;
        match (failed, passed) {
            (Some(failed), passed) => Ok(TestOutcome { passed, failed }),
            (None, Some(passed)) => Ok(TestOutcome {
                passed: Some(passed),
                failed: 0,
            }),
            (None, None) => Err(unparseable()),
        }
    }
}

/// Reject an outcome with more failures than allowed.
pub fn check_threshold(
    target: &str,
    outcome: &TestOutcome,
    max_allowed: u64,
) -> Result<(), VerificationError> {
    if outcome.failed > max_allowed {
        return Err(VerificationError::TooManyFailures {
            target: target.to_string(),
            failed: outcome.failed,
            max_allowed,
        });
    }
    Ok(())
}

/// Run every target in order, stopping at the first that cannot be read or
/// exceeds `max_allowed` failures.
pub fn run_test_suites(
    driver: &mut dyn BuildDriver,
    build_dir: &Path,
    targets: &TestTargetSet,
    parser: &dyn ResultParser,
    max_allowed: u64,
) -> Result<Vec<(String, TestOutcome)>> {
    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets.iter() {
        tracing::info!("Running tests for {}", target);
        let output = driver
            .run_target(build_dir, target)
            .with_context(|| format!("failed to run test target `{}`", target))?;
        tracing::debug!("{}", output);

        let outcome = parser.parse(target, &output)?;
        check_threshold(target, &outcome, max_allowed)?;
        tracing::info!(
            "{}: {} failed, {} passed",
            target,
            outcome.failed,
            outcome
                .passed
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        outcomes.push((target.to_string(), outcome));
    }
    Ok(outcomes)
}
