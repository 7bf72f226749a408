use serde::Serialize;

use wiregraph_core::config::ReportConfig;
use wiregraph_core::AnalysisSummary;

use crate::check::{evaluate, CheckOutcome};

/// Format a full analysis report as JSON.
pub fn format_report(summary: &AnalysisSummary, compact: bool) -> String {
    if compact {
        serde_json::to_string(summary).expect("AnalysisSummary should be serializable")
    } else {
        serde_json::to_string_pretty(summary).expect("AnalysisSummary should be serializable")
    }
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub summary: &'a AnalysisSummary,
    pub check: CheckOutcome,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    summary: &AnalysisSummary,
    config: &ReportConfig,
    compact: bool,
) -> (String, bool) {
    let check = evaluate(summary, config);
    let passed = check.passed;
    let output = CheckOutput { summary, check };

    let json = if compact {
        serde_json::to_string(&output).expect("CheckOutput should be serializable")
    } else {
        serde_json::to_string_pretty(&output).expect("CheckOutput should be serializable")
    };

    (json, passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::tests::sample_summary;

    #[test]
    fn test_format_report_json() {
        let json = format_report(&sample_summary(), false);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["files_analyzed"], 4);
        assert_eq!(parsed["granularity"], "package");
        assert_eq!(parsed["import_cycles"][0][0], "com.acme.a");
        assert_eq!(parsed["coupling"]["com.acme.c"]["afferent"], 1);
        assert_eq!(parsed["components"]["api"]["is_marker_defined"], true);
        assert_eq!(parsed["components"]["api"]["is_declaratively_defined"], true);
    }

    #[test]
    fn test_summary_round_trips() {
        let summary = sample_summary();
        let back: AnalysisSummary =
            serde_json::from_str(&format_report(&summary, true)).unwrap();
        assert_eq!(back.wiring_cycles, summary.wiring_cycles);
        assert_eq!(back.components, summary.components);
    }

    #[test]
    fn test_format_check_json() {
        let (json, passed) = format_check(&sample_summary(), &ReportConfig::default(), true);
        assert!(!passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["check"]["passed"], false);
        assert_eq!(parsed["check"]["failing_wiring_cycles"], 1);
        assert_eq!(parsed["wiring_nodes"], 3);
    }
}
