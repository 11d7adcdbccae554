//! Formatted terminal output.
//!
//! Formatting lives in one place so the scoring and scenario code stays free
//! of presentation concerns.

use crate::domain::{ContributionReport, ImpactMethod, NodeKey, ScenarioRun, ScoreResult};
use crate::scoring::InventoryContribution;
use crate::synthesis::ImpactChange;

/// Contribution breakdown of one report, top `top_n` exchanges.
pub fn format_contributions(report: &ContributionReport, top_n: usize) -> String {
    let mut out = String::new();
    let activity = &report.activity;

    out.push_str(&format!(
        "=== {} ({}) ===\n",
        activity.name,
        activity.location.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("Method: {}\n", report.method));
    out.push_str(&format!("Score: {:.6e}\n", report.total_score));
    if let Some(p) = &report.production {
        out.push_str(&format!("Production: {} {}\n", p.amount, p.unit));
    }
    out.push('\n');

    push_row(
        &mut out,
        format!("{:<40} {:<12} {:>14} {:>8} {:<24}", "exchange", "type", "impact", "%", "compartment"),
    );
    push_row(&mut out, format!("{:-<40} {:-<12} {:-<14} {:-<8} {:-<24}", "", "", "", "", ""));

    for r in report.records.iter().take(top_n) {
        push_row(
            &mut out,
            format!(
                "{:<40} {:<12} {:>14.6e} {:>8.2} {:<24}",
                truncate(&r.exchange_name, 40),
                r.kind.label(),
                r.impact,
                r.percentage,
                truncate(&r.compartment.join("/"), 24),
            ),
        );
    }
    if report.records.len() > top_n {
        out.push_str(&format!("... {} more\n", report.records.len() - top_n));
    }

    out
}

/// Activities by methods score matrix; each method header carries its unit.
pub fn format_scores(
    results: &[(String, ScoreResult)],
    methods: &[ImpactMethod],
    unit_of: impl Fn(&ImpactMethod) -> Option<String>,
) -> String {
    let mut out = String::new();
    for method in methods {
        match unit_of(method) {
            Some(unit) => out.push_str(&format!("{method} [{unit}]\n")),
            None => out.push_str(&format!("{method}\n")),
        }
        for (label, scores) in results {
            let value = scores
                .get(method)
                .map(|v| format!("{v:>14.6e}"))
                .unwrap_or_else(|| format!("{:>14}", "n/a"));
            push_row(&mut out, format!("  {:<48} {value}", truncate(label, 48)));
        }
    }
    out
}

/// Largest characterized inventory cells, labelled flow x process.
pub fn format_hotspots(cells: &[InventoryContribution], name_of: impl Fn(&NodeKey) -> String) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<32} {:<40} {:>14}", "flow", "process", "impact"));
    push_row(&mut out, format!("{:-<32} {:-<40} {:-<14}", "", "", ""));
    for c in cells {
        push_row(
            &mut out,
            format!(
                "{:<32} {:<40} {:>14.6e}",
                truncate(&name_of(&c.flow), 32),
                truncate(&name_of(&c.process), 40),
                c.impact
            ),
        );
    }
    out
}

/// Before/after table of scenario rows.
pub fn format_scenario_runs(runs: &[ScenarioRun]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:<6} {:<28} {:<36} {:>14} {:>14} {:>10}",
            "year", "activity", "method", "before", "after", "change %"
        ),
    );
    push_row(
        &mut out,
        format!("{:-<6} {:-<28} {:-<36} {:-<14} {:-<14} {:-<10}", "", "", "", "", "", ""),
    );
    for r in runs {
        push_row(
            &mut out,
            format!(
                "{:<6} {:<28} {:<36} {:>14.6e} {:>14.6e} {:>10}",
                r.year,
                truncate(&r.activity, 28),
                truncate(&short_method(&r.method), 36),
                r.score_before,
                r.score_after,
                fmt_pct(Some(r.percent_change)),
            ),
        );
    }
    out
}

/// Synthesis table: baseline vs scenario percent changes per activity and method.
pub fn format_changes(changes: &[ImpactChange], early_year: i32, late_year: i32) -> String {
    let mut out = String::new();
    out.push_str(&format!("Change {early_year} -> {late_year}\n"));
    push_row(
        &mut out,
        format!(
            "{:<28} {:<36} {:>12} {:>12} {:>12}",
            "activity", "method", "baseline %", "scenario %", "delta pp"
        ),
    );
    push_row(&mut out, format!("{:-<28} {:-<36} {:-<12} {:-<12} {:-<12}", "", "", "", "", ""));
    for c in changes {
        push_row(
            &mut out,
            format!(
                "{:<28} {:<36} {:>12} {:>12} {:>12}",
                truncate(&c.activity, 28),
                truncate(&short_method(&c.method), 36),
                fmt_pct(c.baseline.percent_change),
                fmt_pct(c.scenario.percent_change),
                fmt_pct(c.scenario_to_baseline_percent),
            ),
        );
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

/// Category and indicator only; the method family is usually shared.
fn short_method(method: &ImpactMethod) -> String {
    match method.parts() {
        [_, rest @ ..] if !rest.is_empty() => rest.join(" | "),
        parts => parts.join(" | "),
    }
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        None => "-".to_string(),
        Some(v) if v.is_infinite() => "inf".to_string(),
        Some(v) => format!("{v:.2}"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contribution::calculate_exchange_impacts;
    use crate::graph::fixtures::{gwp, steel_scorer, steel_store};
    use crate::graph::GraphStore;

    #[test]
    fn contributions_table_is_limited_to_top_n() {
        let store = steel_store();
        let scorer = steel_scorer();
        let steel = store.find_by_id("ei", "steel").found().unwrap();
        let report = calculate_exchange_impacts(&store, &scorer, &steel, &gwp()).unwrap();

        let text = format_contributions(&report, 2);
        assert!(text.starts_with("=== steel production (GLO) ==="));
        assert!(text.contains("Methane, fossil"));
        assert!(!text.contains("Carbon dioxide, fossil"));
        assert!(text.contains("... 1 more"));
    }

    #[test]
    fn score_matrix_shows_units_and_missing_scores() {
        let scorer = steel_scorer();
        let mut scores = ScoreResult::default();
        scores.insert(gwp(), 8.72);
        let results = vec![("steel production (GLO)".to_string(), scores)];
        let methods = vec![gwp(), ImpactMethod::new(["unknown"])];

        let text = format_scores(&results, &methods, |m| scorer.method_unit(m).map(str::to_string));
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("IPCC 2013 | climate change | GWP 100a [kg CO2-Eq]"));
        assert!(lines.next().unwrap().ends_with("8.720000e0"));
        assert_eq!(lines.next(), Some("unknown"));
        assert!(lines.next().unwrap().ends_with("n/a"));
    }

    #[test]
    fn helpers_handle_edge_values() {
        assert_eq!(fmt_pct(None), "-");
        assert_eq!(fmt_pct(Some(f64::INFINITY)), "inf");
        assert_eq!(fmt_pct(Some(-12.5)), "-12.50");
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
        assert_eq!(short_method(&gwp()), "climate change | GWP 100a");
        assert_eq!(short_method(&ImpactMethod::new(["solo"])), "solo");
    }
}
