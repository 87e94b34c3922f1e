use std::fmt::Write as _;

use crate::types::WalkForwardResult;

/// Renders a Markdown summary of a completed validation run. Pure function
/// of the result value.
pub fn render_markdown(result: &WalkForwardResult) -> String {
    let mut out = String::new();

    writeln!(out, "# Walk-Forward Validation Report").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "- **Passed**: {}", result.passed).unwrap();
    writeln!(out, "- **Robustness score**: {:.2} / 100", result.robustness_score).unwrap();
    writeln!(out, "- **Deflated Sharpe**: {:.4}", result.deflated_sharpe).unwrap();
    writeln!(out, "- **PBO**: {:.4}", result.pbo).unwrap();
    writeln!(out, "- **Profitable windows**: {:.1}%", result.profitable_windows_pct * 100.0).unwrap();
    writeln!(out, "- **Avg test Sharpe**: {:.4}", result.avg_test_sharpe).unwrap();
    writeln!(out, "- **Avg test return**: {:.4}", result.avg_test_return).unwrap();
    writeln!(out, "- **Worst drawdown**: {:.4}", result.worst_drawdown).unwrap();
    writeln!(out, "- **Wall time**: {:.2}s", result.wall_time_s).unwrap();
    if let Some(diagnostic) = &result.diagnostic {
        writeln!(out, "- **Diagnostic**: {diagnostic}").unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "| window | train_sharpe | test_sharpe | test_return | test_dd |").unwrap();
    writeln!(out, "|---|---|---|---|---|").unwrap();
    for w in &result.windows {
        writeln!(
            out,
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} |",
            w.window.id, w.train.sharpe, w.test.sharpe, w.test.total_return, w.test.max_drawdown
        )
        .unwrap();
    }

    out
}

/// Serializes the full result as JSON, for archival alongside the report.
pub fn render_json(result: &WalkForwardResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Window, WindowResult};
    use chrono::NaiveDate;
    use trading_interfaces::WindowMetrics;

    fn sample_result() -> WalkForwardResult {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let metrics = WindowMetrics {
            sharpe: 1.0,
            calmar: 1.0,
            max_drawdown: 0.1,
            total_return: 0.02,
            win_rate: 0.5,
            trade_count: 10,
        };
        WalkForwardResult {
            windows: vec![WindowResult {
                window: Window {
                    id: 0,
                    train_start: d,
                    train_end: d,
                    test_start: d,
                    test_end: d,
                },
                train: metrics,
                test: metrics,
                degradation: 1.0,
                failed: false,
            }],
            robustness_score: 80.0,
            passed: true,
            profitable_windows_pct: 1.0,
            avg_test_sharpe: 1.0,
            avg_test_return: 0.02,
            worst_drawdown: 0.1,
            deflated_sharpe: 0.9,
            pbo: 0.1,
            num_trials: Some(1),
            paths_tested: Some(100),
            wall_time_s: 0.01,
            diagnostic: None,
        }
    }

    #[test]
    fn markdown_contains_window_table() {
        let md = render_markdown(&sample_result());
        assert!(md.contains("| window | train_sharpe | test_sharpe | test_return | test_dd |"));
        assert!(md.contains("Robustness score"));
    }

    #[test]
    fn json_round_trips() {
        let result = sample_result();
        let json = render_json(&result).unwrap();
        let parsed: WalkForwardResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.windows.len(), result.windows.len());
    }
}
