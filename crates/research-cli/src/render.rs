use research_orchestrator::AnalysisReport;
use std::fmt::Write;
use valuation_engine::{Band, SotpOutcome, Tone};

fn pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:+.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn tone_marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Positive => "+",
        Tone::Caution => "~",
        Tone::Negative => "-",
    }
}

fn band_line(out: &mut String, title: &str, band: &Band) {
    let _ = writeln!(out, "  [{}] {:<20} {}", tone_marker(band.tone), title, band.label);
}

/// Plain-text report for terminal output
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let ccy = &report.currency;

    let _ = writeln!(out, "{} ({}) {} {:.2} [{}]", report.name, report.symbol, ccy, report.price, report.report_type);
    let _ = writeln!(out, "Fetched {}", report.fetched_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    let dcf = &report.dcf;
    let _ = writeln!(
        out,
        "DCF ({} scenario, {} terminal, decay {})",
        report.scenario,
        report.terminal_method,
        if report.use_decay { "on" } else { "off" }
    );
    let _ = writeln!(out, "  Intrinsic value   {} {:.2}", ccy, dcf.intrinsic_value_per_share);
    let _ = writeln!(out, "  Margin of safety  {}", pct(dcf.margin_of_safety_pct));
    let _ = writeln!(out, "  Implied growth    {}", pct(report.implied_growth_rate));
    let _ = writeln!(out, "  PV of FCF         {:.2}", dcf.discounted_fcf_sum);
    let _ = writeln!(out, "  PV of terminal    {:.2}", dcf.discounted_terminal_value);
    if let Some(fcf) = report.latest_free_cash_flow {
        let _ = writeln!(out, "  Statement FCF     {:.2}", fcf);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<5} {:>8} {:>12} {:>12}", "Year", "Growth", "FCF", "PV");
    for row in &dcf.projections {
        let _ = writeln!(
            out,
            "  {:<5} {:>7.2}% {:>12.2} {:>12.2}",
            row.label(),
            row.growth_used,
            row.fcf,
            row.discounted
        );
    }
    let _ = writeln!(out);

    match &report.sotp {
        SotpOutcome::NotApplicable => {
            let _ = writeln!(out, "SOTP: not applicable (no segment data)");
        }
        SotpOutcome::Valued(sotp) => {
            let _ = writeln!(out, "SOTP");
            for c in &sotp.contributions {
                let _ = writeln!(
                    out,
                    "  {:<24} {:>10.2} x {:>5.1} = {:>12.2} ({:.1}%)",
                    c.name, c.ebitda, c.multiple, c.ev, c.share_of_total * 100.0
                );
            }
            let _ = writeln!(out, "  Total EV          {:.2}", sotp.total_ev);
            let _ = writeln!(out, "  Net debt          {:.2}", sotp.net_debt);
            let _ = writeln!(out, "  Equity value      {:.2}", sotp.equity_value);
            let _ = writeln!(out, "  Target price      {} {:.2}", ccy, sotp.target_price_per_share);
            let _ = writeln!(out, "  Upside            {}", pct(sotp.upside_pct));
        }
    }
    let _ = writeln!(out);

    let insights = &report.insights;
    let _ = writeln!(out, "Insights");
    band_line(&mut out, "Piotroski F-Score", &insights.f_score);
    band_line(&mut out, "EV/EBITDA", &insights.ev_to_ebitda);
    band_line(&mut out, "Debt/Equity", &insights.leverage);
    band_line(&mut out, "Interest coverage", &insights.interest_coverage);
    band_line(&mut out, "PEG", &insights.peg);
    band_line(&mut out, "P/E", &insights.pe);
    band_line(&mut out, "P/E vs industry", &insights.relative_pe);
    band_line(&mut out, "Intrinsic value", &insights.intrinsic_value);

    for classic in &insights.classic {
        let verdict = match &classic.insight {
            Some(insight) => format!("{:.1}% {}", insight.percent_difference, insight.label.as_str()),
            None => "n/a".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<24} {} {:>10.2}  {}",
            classic.model.name(),
            ccy,
            classic.fair_value,
            verdict
        );
    }

    out
}
