use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use valuation_core::{ReportType, ScenarioKind, TerminalMethod};

/// Where snapshots come from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceArg {
    File(PathBuf),
    Dir(PathBuf),
    Gemini,
}

/// Parsed command line. Every calculator override is optional; unset values
/// keep the snapshot-derived defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub source: SourceArg,
    pub symbol: Option<String>,
    pub report_type: ReportType,
    pub scenario: Option<ScenarioKind>,
    pub method: Option<TerminalMethod>,
    pub no_decay: bool,
    pub growth: Option<f64>,
    pub discount: Option<f64>,
    pub terminal: Option<f64>,
    pub fcf: Option<f64>,
    pub net_debt: Option<f64>,
    pub segment_multiples: Vec<(usize, f64)>,
    pub json: bool,
}

pub const USAGE: &str = "\
Usage:
  research-cli --symbol TCS [--report consolidated|standalone]
  research-cli --file snapshots/ACME.json
  research-cli --dir snapshots --symbol ACME

Overrides:
  --scenario bear|base|bull   --method growth|multiple   --no-decay
  --growth <pct> --discount <pct> --terminal <pct|x> --fcf <per share>
  --net-debt <per share> --segment-multiple <index>=<x> (repeatable)
  --json                      print the report as JSON";

fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn number_of(args: &[String], flag: &str) -> Result<Option<f64>> {
    value_of(args, flag)
        .map(|v| v.parse::<f64>().with_context(|| format!("{} expects a number, got '{}'", flag, v)))
        .transpose()
}

fn segment_multiples(args: &[String]) -> Result<Vec<(usize, f64)>> {
    args.windows(2)
        .filter(|w| w[0] == "--segment-multiple")
        .map(|w| -> Result<(usize, f64)> {
            let (index, multiple) = w[1]
                .split_once('=')
                .with_context(|| format!("--segment-multiple expects <index>=<x>, got '{}'", w[1]))?;
            Ok((
                index.trim().parse::<usize>().context("segment index must be an integer")?,
                multiple.trim().parse::<f64>().context("segment multiple must be a number")?,
            ))
        })
        .collect()
}

impl CliArgs {
    /// Parse arguments (without the program name). `snapshot_dir` is the
    /// `SNAPSHOT_DIR` fallback used when neither `--file` nor `--dir` is given.
    pub fn parse(args: &[String], snapshot_dir: Option<PathBuf>) -> Result<Self> {
        let source = if let Some(path) = value_of(args, "--file") {
            SourceArg::File(PathBuf::from(path))
        } else if let Some(dir) = value_of(args, "--dir") {
            SourceArg::Dir(PathBuf::from(dir))
        } else if let Some(dir) = snapshot_dir {
            SourceArg::Dir(dir)
        } else {
            SourceArg::Gemini
        };

        let symbol = value_of(args, "--symbol").map(str::to_string);
        if symbol.is_none() && !matches!(source, SourceArg::File(_)) {
            bail!("--symbol is required unless --file is given\n\n{}", USAGE);
        }

        Ok(Self {
            source,
            symbol,
            report_type: value_of(args, "--report").map(str::parse::<ReportType>).transpose()?.unwrap_or_default(),
            scenario: value_of(args, "--scenario").map(str::parse::<ScenarioKind>).transpose()?,
            method: value_of(args, "--method").map(str::parse::<TerminalMethod>).transpose()?,
            no_decay: args.iter().any(|a| a == "--no-decay"),
            growth: number_of(args, "--growth")?,
            discount: number_of(args, "--discount")?,
            terminal: number_of(args, "--terminal")?,
            fcf: number_of(args, "--fcf")?,
            net_debt: number_of(args, "--net-debt")?,
            segment_multiples: segment_multiples(args)?,
            json: args.iter().any(|a| a == "--json"),
        })
    }

    /// Query sent to the provider: the symbol, or the file stem for `--file`
    pub fn query(&self) -> String {
        if let Some(symbol) = &self.symbol {
            return symbol.clone();
        }
        match &self.source {
            SourceArg::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}
