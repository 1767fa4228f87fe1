//! Run policies and limits.

use serde::{Deserialize, Serialize};

/// Upper bound on findings carried in a report. Counts keep accumulating
/// past the cap; only the finding detail is truncated.
pub const DEFAULT_MAX_FINDINGS: usize = 1_000_000;

/// Whether later phases run when the syntactical phase found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatePolicy {
    /// Register and logical phases are skipped when any syntactical error
    /// was found. Their findings would be unreliable on malformed data.
    #[default]
    SkipOnSyntaxErrors,
    /// Run every phase regardless of syntactical findings.
    RunAllPhases,
}

/// How warnings affect the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningPolicy {
    /// A submission with warnings is not clean.
    #[default]
    WarningsFailValidation,
    /// Warnings are reported but do not fail validation.
    WarningsAdvisory,
}

/// Engine policies for one run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub gate_policy: GatePolicy,
    pub warning_policy: WarningPolicy,
    pub max_findings: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            gate_policy: GatePolicy::default(),
            warning_policy: WarningPolicy::default(),
            max_findings: DEFAULT_MAX_FINDINGS,
        }
    }
}

impl EngineOptions {
    pub fn with_gate_policy(mut self, policy: GatePolicy) -> Self {
        self.gate_policy = policy;
        self
    }

    pub fn with_warning_policy(mut self, policy: WarningPolicy) -> Self {
        self.warning_policy = policy;
        self
    }

    pub fn with_max_findings(mut self, max: usize) -> Self {
        self.max_findings = max;
        self
    }
}

/// Outcome of the phase gate after the syntactical pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum GateDecision {
    /// Later phases ran.
    Proceed,
    /// Register and logical phases were skipped.
    SkippedOnSyntaxErrors { error_total: u64 },
}

impl GateDecision {
    pub fn proceeded(self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}
