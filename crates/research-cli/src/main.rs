//! research-cli: value one ticker from a saved snapshot or a live Gemini analysis.
//!
//! Usage:
//!   cargo run -p research-cli -- --symbol TCS
//!   cargo run -p research-cli -- --file snapshots/ACME.json --scenario bull --json
//!   cargo run -p research-cli -- --dir snapshots --symbol ACME --method multiple --terminal 18

mod args;
mod render;

use anyhow::{bail, Context};
use args::{CliArgs, SourceArg};
use research_orchestrator::{
    Analysis, GeminiProvider, JsonFileProvider, LoadingState, ResearchSession, SearchOutcome,
};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use valuation_core::SnapshotProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "research_cli=info,research_orchestrator=info".into());

    // Logs go to stderr so --json output stays machine-readable
    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let raw: Vec<String> = std::env::args().collect();
    if raw.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", args::USAGE);
        return Ok(());
    }

    let snapshot_dir = std::env::var("SNAPSHOT_DIR").ok().map(PathBuf::from);
    let args = CliArgs::parse(raw.get(1..).unwrap_or_default(), snapshot_dir)?;

    match args.source.clone() {
        SourceArg::File(path) => run(JsonFileProvider::from_file(path), &args).await,
        SourceArg::Dir(dir) => run(JsonFileProvider::from_dir(dir), &args).await,
        SourceArg::Gemini => run(GeminiProvider::with_defaults(), &args).await,
    }
}

async fn run<P: SnapshotProvider>(provider: P, args: &CliArgs) -> anyhow::Result<()> {
    tracing::info!("Using {} provider", provider.name());
    let session = ResearchSession::new(provider);
    let query = args.query();

    match session.search(&query, args.report_type).await {
        SearchOutcome::Applied(LoadingState::Success) => {}
        SearchOutcome::Applied(_) => {
            let state = session.state().await;
            bail!(
                "{}",
                state.error.unwrap_or_else(|| format!("analysis of {} failed", query))
            );
        }
        SearchOutcome::Superseded => bail!("search for {} was superseded", query),
    }

    let report = session
        .with_analysis(|analysis| -> anyhow::Result<_> {
            let applied = apply_overrides(analysis, args)?;
            tracing::info!("Applied {} override(s) to {}", applied, analysis.snapshot.symbol);
            Ok(analysis.report())
        })
        .await
        .context("no analysis available")??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::render_text(&report));
    }
    tracing::info!(
        "Report written for {} ({})",
        report.symbol,
        if args.json { "json" } else { "text" }
    );
    Ok(())
}

/// Push command line overrides into the calculators. Returns how many were set.
fn apply_overrides(analysis: &mut Analysis, args: &CliArgs) -> anyhow::Result<usize> {
    let mut applied = 0;
    let dcf = &mut analysis.dcf;

    if let Some(scenario) = args.scenario {
        dcf.set_active_scenario(scenario);
        applied += 1;
    }
    // Method first: switching it rewrites the terminal defaults
    if let Some(method) = args.method {
        dcf.set_terminal_method(method);
        applied += 1;
    }
    if args.no_decay {
        dcf.set_use_decay(false);
        applied += 1;
    }
    if let Some(growth) = args.growth {
        dcf.set_growth_rate(growth);
        applied += 1;
    }
    if let Some(discount) = args.discount {
        dcf.set_discount_rate(discount);
        applied += 1;
    }
    if let Some(terminal) = args.terminal {
        dcf.set_terminal_val(terminal);
        applied += 1;
    }
    if let Some(fcf) = args.fcf {
        dcf.set_fcf(fcf);
        applied += 1;
    }
    if let Some(net_debt) = args.net_debt {
        dcf.set_net_debt_per_share(net_debt);
        applied += 1;
    }
    for &(index, multiple) in &args.segment_multiples {
        analysis
            .sotp
            .set_segment_multiple(index, multiple)
            .with_context(|| format!("--segment-multiple {}={}", index, multiple))?;
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use valuation_core::{
        BusinessSegment, FinancialSnapshot, ReportType, ScenarioKind, TerminalMethod,
    };

    fn analysis() -> Analysis {
        let snapshot = FinancialSnapshot {
            symbol: "ACME".to_string(),
            price: 100.0,
            fcf_per_share: 5.0,
            growth_rate: 10.0,
            discount_rate: 10.0,
            terminal_rate: 3.0,
            segments: vec![BusinessSegment {
                name: "Cloud".to_string(),
                ebitda: 100.0,
                valuation_multiple: 10.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        Analysis::new(snapshot, ReportType::Consolidated)
    }

    fn args(line: &str) -> CliArgs {
        let raw: Vec<String> = line.split_whitespace().map(String::from).collect();
        CliArgs::parse(&raw, None).unwrap()
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let mut analysis = analysis();
        let before = analysis.report();

        let applied = apply_overrides(&mut analysis, &args("--symbol ACME")).unwrap();
        assert_eq!(applied, 0);
        assert_eq!(analysis.report().dcf, before.dcf);
    }

    #[test]
    fn test_overrides_reach_the_calculators() {
        let mut analysis = analysis();
        let applied = apply_overrides(
            &mut analysis,
            &args("--symbol ACME --scenario bull --method multiple --terminal 18 --no-decay --segment-multiple 0=20"),
        )
        .unwrap();

        assert_eq!(applied, 5);
        assert_eq!(analysis.dcf.active_scenario(), ScenarioKind::Bull);
        assert_eq!(analysis.dcf.terminal_method(), TerminalMethod::Multiple);
        // set after the method switch, so it is not overwritten by the 20x bull default
        assert_eq!(analysis.dcf.active_params().terminal_val, 18.0);
        assert!(!analysis.dcf.use_decay());
        assert_eq!(analysis.sotp.segments()[0].valuation_multiple, 20.0);
    }

    #[test]
    fn test_bad_segment_index_is_reported() {
        let mut analysis = analysis();
        let err = apply_overrides(&mut analysis, &args("--symbol ACME --segment-multiple 3=12")).unwrap_err();
        assert!(err.to_string().contains("--segment-multiple 3=12"));
    }
}
