//! Phased validation engine for register submissions.
//!
//! A run makes at most two streaming passes over the source. The first
//! pass evaluates the syntactical schema batch by batch while feeding the
//! register accumulator. If the phase gate allows, register rules are
//! finalized and a second pass evaluates the logical schema. Results come
//! back in phase order: syntactical, register, logical.

pub mod aggregate;
pub mod evaluator;
pub mod options;
pub mod register;
pub mod runner;
pub mod schema;

use serde::{Deserialize, Serialize};

use sblar_ingest::CsvSource;
use sblar_model::{Result, RunContext, ValidationPhase, ValidationResults};
use sblar_rules::FieldValidations;

pub use aggregate::PhaseAggregator;
pub use evaluator::BatchEvaluator;
pub use options::{DEFAULT_MAX_FINDINGS, EngineOptions, GateDecision, GatePolicy, WarningPolicy};
pub use register::RegisterAccumulator;
pub use runner::{BatchOutcome, run_phase_batch};
pub use schema::{ColumnChecks, PhaseSchema, render_schema};

/// Everything one validation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-phase results, in execution order. Skipped phases are absent.
    pub results: Vec<ValidationResults>,
    pub gate: GateDecision,
    /// Records observed in the register.
    pub record_count: u64,
    /// True iff every executed phase is valid and nothing was skipped.
    pub is_valid: bool,
}

impl RunReport {
    pub fn findings(&self) -> impl Iterator<Item = &sblar_model::Finding> {
        self.results.iter().flat_map(|r| r.findings.iter())
    }

    pub fn phase(&self, phase: ValidationPhase) -> Option<&ValidationResults> {
        self.results.iter().find(|r| r.phase == phase)
    }

    pub fn error_total(&self) -> u64 {
        self.results.iter().map(|r| r.error_counts.total_count).sum()
    }

    pub fn warning_total(&self) -> u64 {
        self.results
            .iter()
            .map(|r| r.warning_counts.total_count)
            .sum()
    }
}

/// Validate one register source end to end.
pub fn validate_source(
    source: &CsvSource,
    catalogue: &[FieldValidations],
    ctx: &RunContext,
    options: &EngineOptions,
) -> Result<RunReport> {
    // Surface context misconfiguration before touching the source.
    ctx.expected_record_count()?;

    let syntactical = render_schema(catalogue, ValidationPhase::Syntactical)?;
    let logical = render_schema(catalogue, ValidationPhase::Logical)?;

    let mut accumulator = RegisterAccumulator::new();
    let mut syn_agg = PhaseAggregator::new(&syntactical);
    for batch in source.batches()? {
        let batch = batch?;
        accumulator.observe(&batch)?;
        syn_agg.absorb(run_phase_batch(&syntactical, &batch)?);
    }
    let record_count = accumulator.total();
    let syn_errors = syn_agg.error_total();

    let mut budget = options.max_findings;
    let syn_results = syn_agg.finish(options.warning_policy, budget);
    budget = budget.saturating_sub(syn_results.finding_count());

    if syn_errors > 0 && options.gate_policy == GatePolicy::SkipOnSyntaxErrors {
        tracing::info!(
            errors = syn_errors,
            "syntactical errors found, later phases skipped"
        );
        return Ok(RunReport {
            results: vec![syn_results],
            gate: GateDecision::SkippedOnSyntaxErrors {
                error_total: syn_errors,
            },
            record_count,
            is_valid: false,
        });
    }

    let mut register_results = accumulator.finalize(ctx)?;
    if register_results.finding_count() > budget {
        register_results.findings.truncate(budget);
    }
    budget = budget.saturating_sub(register_results.finding_count());

    let mut log_agg = PhaseAggregator::new(&logical);
    for batch in source.batches()? {
        log_agg.absorb(run_phase_batch(&logical, &batch?)?);
    }
    let log_results = log_agg.finish(options.warning_policy, budget);

    let is_valid =
        syn_results.is_valid && register_results.is_valid && log_results.is_valid;
    tracing::info!(
        records = record_count,
        errors = syn_results.error_counts.total_count
            + register_results.error_counts.total_count
            + log_results.error_counts.total_count,
        valid = is_valid,
        "validation run complete"
    );

    Ok(RunReport {
        results: vec![syn_results, register_results, log_results],
        gate: GateDecision::Proceed,
        record_count,
        is_valid,
    })
}
