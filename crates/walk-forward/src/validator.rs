use std::time::Instant;

use rayon::prelude::*;
use trading_interfaces::{StrategyEvaluator, WindowMetrics};

use crate::error::WalkForwardError;
use crate::metrics::{deflated_sharpe_ratio, probability_of_backtest_overfitting, robustness_breakdown};
use crate::types::{WalkForwardConfig, WalkForwardResult, Window, WindowResult};
use crate::windows::generate_windows;

const EPS: f64 = 1e-9;
const PBO_TRIALS: usize = 100;

fn zeroed_metrics() -> WindowMetrics {
    WindowMetrics {
        sharpe: 0.0,
        calmar: 0.0,
        max_drawdown: 0.0,
        total_return: 0.0,
        win_rate: 0.0,
        trade_count: 0,
    }
}

/// Evaluates a single window's train and test splits against `evaluator`,
/// blocking on a per-call single-threaded runtime so this can run inside a
/// rayon worker thread without fighting the caller's own async runtime.
fn evaluate_window(evaluator: &dyn StrategyEvaluator, code: &str, window: Window) -> WindowResult {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build per-window evaluator runtime");

    let train = rt.block_on(evaluator.evaluate(code, window.train_start, window.train_end));
    let test = rt.block_on(evaluator.evaluate(code, window.test_start, window.test_end));

    let (train, test, failed) = match (train, test) {
        (Ok(train), Ok(test)) => (train, test, false),
        (train, test) => {
            tracing::warn!(window_id = window.id, "evaluator failed on window, recording zeroed metrics");
            (
                train.unwrap_or_else(|_| zeroed_metrics()),
                test.unwrap_or_else(|_| zeroed_metrics()),
                true,
            )
        }
    };

    let degradation = (test.sharpe / train.sharpe.max(EPS)).min(1.0);

    WindowResult {
        window,
        train,
        test,
        degradation,
        failed,
    }
}

/// Runs the full purged/embargoed walk-forward validation for `code`
/// against `evaluator`, per `config`. Windows are evaluated in parallel;
/// aggregation is deterministic given a fixed `config.seed`.
pub fn validate(
    config: &WalkForwardConfig,
    code: &str,
    evaluator: &dyn StrategyEvaluator,
) -> Result<WalkForwardResult, WalkForwardError> {
    let started = Instant::now();

    let windows = generate_windows(config);
    if windows.len() < config.min_windows {
        return Err(WalkForwardError::InsufficientData {
            generated: windows.len(),
            min_windows: config.min_windows,
        });
    }

    let results: Vec<WindowResult> = windows
        .par_iter()
        .map(|&window| evaluate_window(evaluator, code, window))
        .collect();

    let failed_count = results.iter().filter(|w| w.failed).count();
    let diagnostic = if failed_count * 2 > results.len() {
        Some(format!(
            "{failed_count} of {} windows failed evaluation; results are unreliable",
            results.len()
        ))
    } else {
        None
    };

    let breakdown = robustness_breakdown(&results);

    let profitable_windows_pct =
        results.iter().filter(|w| w.test.total_return > 0.0).count() as f64 / results.len() as f64;
    let avg_test_sharpe = results.iter().map(|w| w.test.sharpe).sum::<f64>() / results.len() as f64;
    let avg_test_return = results.iter().map(|w| w.test.total_return).sum::<f64>() / results.len() as f64;
    let worst_drawdown = results
        .iter()
        .map(|w| w.test.max_drawdown)
        .fold(0.0_f64, f64::max);

    let num_trials = results.len() as u32;
    let deflated_sharpe = deflated_sharpe_ratio(avg_test_sharpe, num_trials as usize);
    let pbo = probability_of_backtest_overfitting(&results, PBO_TRIALS, config.seed);

    let above_half = results.iter().filter(|w| w.test.sharpe >= config.min_test_sharpe).count();

    let passed = diagnostic.is_none()
        && breakdown.score >= config.min_robustness_score
        && profitable_windows_pct >= config.min_profitable_windows_pct
        && worst_drawdown <= config.max_drawdown_threshold
        && above_half > results.len() / 2;

    Ok(WalkForwardResult {
        windows: results,
        robustness_score: breakdown.score,
        passed,
        profitable_windows_pct,
        avg_test_sharpe,
        avg_test_return,
        worst_drawdown,
        deflated_sharpe,
        pbo,
        num_trials: Some(num_trials),
        paths_tested: Some(PBO_TRIALS as u32),
        wall_time_s: started.elapsed().as_secs_f64(),
        diagnostic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate};
    use trading_interfaces::InterfaceError;

    struct StubEvaluator;

    #[async_trait]
    impl StrategyEvaluator for StubEvaluator {
        async fn evaluate(
            &self,
            _code: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<WindowMetrics, InterfaceError> {
            let sharpe = 1.0 + (start.day0() as f64) * 0.001;
            Ok(WindowMetrics {
                sharpe,
                calmar: 1.0,
                max_drawdown: 0.1,
                total_return: 0.01,
                win_rate: 0.55,
                trade_count: 20,
            })
        }
    }

    struct FailingEvaluator;

    #[async_trait]
    impl StrategyEvaluator for FailingEvaluator {
        async fn evaluate(
            &self,
            _code: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<WindowMetrics, InterfaceError> {
            Err(InterfaceError::EvaluatorFailure {
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
                reason: "stub failure".into(),
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn validates_end_to_end_with_stub_evaluator() {
        let config = WalkForwardConfig::new(
            date(2020, 1, 1),
            date(2023, 1, 1),
            6,
            2,
            2,
            0,
            0,
            2,
            0.1,
            0.0,
            0.5,
            0.0,
            Some(7),
        )
        .unwrap();
        let result = validate(&config, "my-strategy", &StubEvaluator).unwrap();
        assert!(!result.windows.is_empty());
        assert!(result.diagnostic.is_none());
        assert!(result.wall_time_s >= 0.0);
    }

    #[test]
    fn insufficient_windows_errors() {
        let config = WalkForwardConfig::new(
            date(2020, 1, 1),
            date(2020, 6, 1),
            6,
            2,
            2,
            0,
            0,
            5,
            0.1,
            0.0,
            0.5,
            0.0,
            None,
        )
        .unwrap();
        let err = validate(&config, "x", &StubEvaluator).unwrap_err();
        assert!(matches!(err, WalkForwardError::InsufficientData { .. }));
    }

    #[test]
    fn total_evaluator_failure_reports_diagnostic() {
        let config = WalkForwardConfig::new(
            date(2020, 1, 1),
            date(2023, 1, 1),
            6,
            2,
            2,
            0,
            0,
            2,
            0.1,
            0.0,
            0.5,
            0.0,
            Some(7),
        )
        .unwrap();
        let result = validate(&config, "x", &FailingEvaluator).unwrap();
        assert!(!result.passed);
        assert!(result.diagnostic.is_some());
    }
}
