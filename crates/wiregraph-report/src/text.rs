use colored::Colorize;

use wiregraph_core::config::ReportConfig;
use wiregraph_core::{AnalysisSummary, ComponentInfo, CouplingMetrics};

use crate::check::{evaluate, Stability};

/// Format a full analysis report for terminal output.
pub fn format_report(summary: &AnalysisSummary, config: &ReportConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        "wiregraph - Dependency Analysis".bold()
    ));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    out.push_str(&format!(
        "{}: {} files analyzed, {} skipped (granularity: {})\n",
        "Summary".bold(),
        summary.files_analyzed,
        summary.files_skipped,
        summary.granularity,
    ));
    out.push_str(&format!(
        "  Import graph: {} nodes, {} edges\n",
        summary.import_nodes, summary.import_edges
    ));
    out.push_str(&format!(
        "  Wiring graph: {} components, {} edges\n",
        summary.wiring_nodes, summary.wiring_edges
    ));

    out.push_str(&format_cycles("Import cycles", &summary.import_cycles));
    out.push_str(&format_cycles("Wiring cycles", &summary.wiring_cycles));

    if !summary.coupling.is_empty() {
        out.push_str(&format!(
            "\n{}\n{}\n",
            "Coupling (import graph)".bold(),
            "-".repeat(40)
        ));
        out.push_str(&format_coupling(summary.coupling.iter(), config.instability_threshold));
    }

    if !summary.components.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n{}\n",
            "Components".bold(),
            summary.components.len(),
            "-".repeat(40)
        ));
        for info in summary.components.values().filter(|c| !c.is_dangling()) {
            out.push_str(&format_component(info));
        }

        let dangling = summary.dangling_components();
        if !dangling.is_empty() {
            out.push_str(&format!(
                "\n{} ({} found)\n",
                "Dangling references".yellow().bold(),
                dangling.len()
            ));
            for info in dangling {
                out.push_str(&format!("  {}\n", info.id));
            }
        }
    }

    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(summary: &AnalysisSummary, config: &ReportConfig) -> (String, bool) {
    let outcome = evaluate(summary, config);
    let mut out = format_report(summary, config);

    if outcome.passed {
        out.push_str(&format!("\n{}\n", "CHECK PASSED".green().bold()));
    } else {
        out.push_str(&format!(
            "\n{}: {} import cycle(s), {} wiring cycle(s), {} instability breach(es)\n",
            "CHECK FAILED".red().bold(),
            outcome.failing_import_cycles,
            outcome.failing_wiring_cycles,
            outcome.instability_breaches.len(),
        ));
        for breach in &outcome.instability_breaches {
            out.push_str(&format!("  {} ({:.2})\n", breach.id, breach.instability));
        }
    }

    (out, outcome.passed)
}

/// `a -> b -> c -> a`; a self-edge renders as `a -> a`.
pub fn cycle_path(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}

fn format_cycles(title: &str, cycles: &[Vec<String>]) -> String {
    if cycles.is_empty() {
        return format!("\n{}\n", format!("No {}", title.to_lowercase()).green().bold());
    }
    let mut out = format!(
        "\n{} ({} found)\n{}\n",
        title.red().bold(),
        cycles.len(),
        "-".repeat(40)
    );
    for (i, cycle) in cycles.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, cycle_path(cycle)));
    }
    out
}

fn format_coupling<'a>(
    metrics: impl Iterator<Item = (&'a String, &'a CouplingMetrics)>,
    threshold: f64,
) -> String {
    let mut rows: Vec<_> = metrics.collect();
    rows.sort_by(|(a_id, a), (b_id, b)| {
        b.instability
            .total_cmp(&a.instability)
            .then_with(|| a_id.cmp(b_id))
    });

    let mut out = format!("  {:<6} {:<6} {:<6} {:<16} id\n", "Ca", "Ce", "I", "class");
    for (id, m) in rows {
        let class = Stability::classify(m, threshold);
        let label = format!("{class:<16}");
        let label = match class {
            Stability::Unstable => label.red().to_string(),
            Stability::Stable => label.green().to_string(),
            _ => label,
        };
        out.push_str(&format!(
            "  {:<6} {:<6} {:<6.2} {} {}\n",
            m.afferent, m.efferent, m.instability, label, id
        ));
    }
    out
}

fn format_component(info: &ComponentInfo) -> String {
    let origin = match (info.is_declaratively_defined, info.is_marker_defined) {
        (true, true) => "markup+marker",
        (true, false) => "markup",
        (false, true) => "marker",
        (false, false) => "undeclared",
    };
    let mut line = format!("  {} [{}]", info.id.bold(), origin);
    if let Some(class) = &info.class_name {
        line.push_str(&format!(" {class}"));
    }
    if let Some(scope) = &info.scope {
        line.push_str(&format!(" scope={scope}"));
    }
    line.push('\n');
    line
}
