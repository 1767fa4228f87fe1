//! Command implementations.

use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use sblar_engine::{
    EngineOptions, GatePolicy, RunReport, WarningPolicy, validate_source,
};
use sblar_ingest::{CsvSource, MissingColumnPolicy, ReaderOptions};
use sblar_model::{CodeLookup, LEI_PARAM, RECORD_COUNT_PARAM, RunContext};
use sblar_refdata::{CensusGeoids, NaicsCodes};
use sblar_rules::{catalogue_fields, phase_validations};

use crate::cli::{ReportFormatArg, ValidateArgs};
use crate::output::{ReportFormat, render_report};

/// Validate a register and render the report. Returns the finished report
/// so the caller can derive the exit code.
pub fn run_validate(args: &ValidateArgs) -> anyhow::Result<RunReport> {
    let ctx = build_context(args);
    let (naics, geoids) = load_lookups(args)?;
    let catalogue = phase_validations(&ctx, naics, geoids)?;

    let mut reader_options = ReaderOptions::default().with_batch_size(args.batch_size);
    if args.allow_missing_columns {
        reader_options =
            reader_options.with_missing_column_policy(MissingColumnPolicy::TreatAsBlank);
    }
    let source = CsvSource::open(&args.register, &catalogue_fields(&catalogue), reader_options)?;

    let mut engine_options = EngineOptions::default().with_max_findings(args.max_findings);
    if args.run_all_phases {
        engine_options = engine_options.with_gate_policy(GatePolicy::RunAllPhases);
    }
    if args.warnings_advisory {
        engine_options = engine_options.with_warning_policy(WarningPolicy::WarningsAdvisory);
    }

    let report = validate_source(&source, &catalogue, &ctx, &engine_options)?;

    let format = match args.format {
        ReportFormatArg::Table => ReportFormat::Table,
        ReportFormatArg::Csv => ReportFormat::Csv,
        ReportFormatArg::Json => ReportFormat::Json,
    };
    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("cannot create report file {}", path.display()))?;
            render_report(&report, format, &mut file)?;
            file.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            render_report(&report, format, &mut handle)?;
        }
    }

    Ok(report)
}

/// Print the rule catalogue, one row per rule.
pub fn run_rules() -> anyhow::Result<()> {
    let empty: Arc<dyn CodeLookup> = Arc::new(std::collections::HashSet::<String>::new());
    let catalogue = phase_validations(&RunContext::new(), empty.clone(), empty)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Rule", "Field", "Phase", "Severity", "Name"]);
    for fv in &catalogue {
        for (phase, checks) in [("syntactical", &fv.phase1), ("logical", &fv.phase2)] {
            for check in checks {
                table.add_row(vec![
                    Cell::new(&check.meta.id),
                    Cell::new(&fv.field),
                    Cell::new(phase),
                    Cell::new(check.meta.severity),
                    Cell::new(&check.meta.name),
                ]);
            }
        }
    }
    for rule in sblar_rules::RegisterRule::all() {
        let meta = rule.meta();
        table.add_row(vec![
            Cell::new(&meta.id),
            Cell::new("uid"),
            Cell::new("register"),
            Cell::new(meta.severity),
            Cell::new(&meta.name),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn build_context(args: &ValidateArgs) -> RunContext {
    let mut ctx = RunContext::new();
    for (key, value) in &args.context {
        ctx.set(key, value);
    }
    if let Some(lei) = &args.lei {
        ctx.set(LEI_PARAM, lei);
    }
    if let Some(count) = args.expected_record_count {
        ctx.set(RECORD_COUNT_PARAM, count.to_string());
    }
    ctx
}

fn load_lookups(args: &ValidateArgs) -> anyhow::Result<(Arc<dyn CodeLookup>, Arc<dyn CodeLookup>)> {
    let naics: Arc<dyn CodeLookup> = match &args.naics_file {
        Some(path) => Arc::new(NaicsCodes::load(path)?),
        None => {
            tracing::warn!("no NAICS file supplied, NAICS code lookups will fail");
            Arc::new(NaicsCodes::default())
        }
    };
    let geoids: Arc<dyn CodeLookup> = match &args.geoids_file {
        Some(path) => Arc::new(CensusGeoids::load(path)?),
        None => {
            tracing::warn!("no GEOID file supplied, census tract lookups will fail");
            Arc::new(CensusGeoids::default())
        }
    };
    Ok((naics, geoids))
}
