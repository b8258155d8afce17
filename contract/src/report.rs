//! Per-case outcomes and the suite report.

use harness_common::{FailureKind, HarnessError, SubCheck};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Every sub-check passed
    Passed,
    /// The response broke its contract
    Failed {
        /// Failing sub-check
        check: SubCheck,
        /// Violation message including request context
        detail: String,
    },
    /// Timeout or connection failure during the case
    TransportFailed {
        /// Transport error message
        detail: String,
    },
    /// The environment was not usable
    SetupFailed {
        /// Environment error message
        detail: String,
    },
    /// Not executed after an earlier setup failure in the same scope
    Aborted {
        /// The setup failure that aborted the scope
        cause: String,
    },
}

impl Verdict {
    /// Short label used in the report.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed { .. } => "FAIL",
            Self::TransportFailed { .. } => "TRANSPORT",
            Self::SetupFailed { .. } => "SETUP",
            Self::Aborted { .. } => "ABORTED",
        }
    }
}

/// Outcome of one case within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    /// Case name, usually the fixture name
    pub name: String,
    /// Scope the case ran in
    pub scope: String,
    /// Result
    pub verdict: Verdict,
}

impl CaseOutcome {
    /// Create an outcome.
    #[must_use]
    pub fn new(name: impl Into<String>, scope: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
            verdict,
        }
    }

    /// Classify the result of a case.
    #[must_use]
    pub fn from_result(
        name: impl Into<String>,
        scope: impl Into<String>,
        result: &Result<(), HarnessError>,
    ) -> Self {
        let verdict = match result {
            Ok(()) => Verdict::Passed,
            Err(HarnessError::Contract(violation)) => Verdict::Failed {
                check: violation.check,
                detail: violation.to_string(),
            },
            Err(err) => match err.kind() {
                FailureKind::Transport => Verdict::TransportFailed {
                    detail: err.to_string(),
                },
                FailureKind::Setup | FailureKind::Assertion => Verdict::SetupFailed {
                    detail: err.to_string(),
                },
            },
        };
        Self::new(name, scope, verdict)
    }

    /// Outcome of a case skipped after a setup failure.
    #[must_use]
    pub fn aborted(
        name: impl Into<String>,
        scope: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::new(name, scope, Verdict::Aborted { cause: cause.into() })
    }

    /// Check if the case passed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed)
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<9} {}/{}", self.verdict.label(), self.scope, self.name)?;
        match &self.verdict {
            Verdict::Passed => Ok(()),
            Verdict::Failed { detail, .. }
            | Verdict::TransportFailed { detail }
            | Verdict::SetupFailed { detail } => write!(f, "\n          {detail}"),
            Verdict::Aborted { cause } => {
                write!(f, "\n          aborted after setup failure: {cause}")
            }
        }
    }
}

/// Report over every case of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    /// All outcomes in execution order
    pub outcomes: Vec<CaseOutcome>,
    /// Passed cases
    pub passed: usize,
    /// Contract violations
    pub failed: usize,
    /// Transport failures
    pub transport_failures: usize,
    /// Setup failures
    pub setup_failures: usize,
    /// Cases not executed after a setup failure
    pub aborted: usize,
}

impl SuiteReport {
    /// Create from outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<CaseOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in &outcomes {
            match outcome.verdict {
                Verdict::Passed => report.passed += 1,
                Verdict::Failed { .. } => report.failed += 1,
                Verdict::TransportFailed { .. } => report.transport_failures += 1,
                Verdict::SetupFailed { .. } => report.setup_failures += 1,
                Verdict::Aborted { .. } => report.aborted += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    /// Check if every case passed.
    #[must_use]
    pub fn ok(&self) -> bool {
        !self.outcomes.is_empty() && self.passed == self.outcomes.len()
    }

    /// Process exit code: 0 when everything passed, 1 for assertion or
    /// transport failures, 2 for setup failures or an empty run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.outcomes.is_empty() || self.setup_failures > 0 || self.aborted > 0 {
            2
        } else if self.ok() {
            0
        } else {
            1
        }
    }

    /// Outcomes that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.is_passed())
    }

    /// Outcome by scope and case name.
    #[must_use]
    pub fn get(&self, scope: &str, name: &str) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.scope == scope && o.name == name)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{outcome}")?;
        }
        write!(
            f,
            "\n{} cases: {} passed, {} failed, {} transport errors, {} setup errors, {} aborted",
            self.outcomes.len(),
            self.passed,
            self.failed,
            self.transport_failures,
            self.setup_failures,
            self.aborted
        )
    }
}
