use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::types::WindowResult;

const EPS: f64 = 1e-9;

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// The three [0,1] components that make up the robustness score, plus the
/// weighted composite in [0,100].
pub struct RobustnessBreakdown {
    pub consistency: f64,
    pub profitability: f64,
    pub degradation: f64,
    pub score: f64,
}

pub fn robustness_breakdown(results: &[WindowResult]) -> RobustnessBreakdown {
    let returns: Vec<f64> = results.iter().map(|w| w.test.total_return).collect();
    let abs_returns: Vec<f64> = returns.iter().map(|r| r.abs()).collect();

    let consistency = 1.0 - (std_dev(&returns) / mean(&abs_returns).max(EPS)).min(1.0);

    let profitability = if results.is_empty() {
        0.0
    } else {
        returns.iter().filter(|r| **r > 0.0).count() as f64 / results.len() as f64
    };

    let degradation = mean(
        &results
            .iter()
            .map(|w| (w.test.sharpe / w.train.sharpe.max(EPS)).min(1.0))
            .collect::<Vec<_>>(),
    );

    let score = 100.0 * (0.3 * consistency + 0.4 * profitability + 0.3 * degradation);

    RobustnessBreakdown {
        consistency,
        profitability,
        degradation,
        score,
    }
}

/// `DSR = Phi^-1( Phi(SR) - ln(N)/sqrt(N) )`, clamped to the domain of Phi^-1.
pub fn deflated_sharpe_ratio(observed_sharpe: f64, num_trials: usize) -> f64 {
    let n = num_trials.max(1) as f64;
    let normal = Normal::new(0.0, 1.0).expect("standard normal is always valid");
    let deflator = if n > 1.0 { n.ln() / n.sqrt() } else { 0.0 };
    let adjusted = (normal.cdf(observed_sharpe) - deflator).clamp(1e-12, 1.0 - 1e-12);
    normal.inverse_cdf(adjusted)
}

/// Minimum track record length (in observations) needed for a Sharpe ratio
/// estimate to be statistically distinguishable from zero at the given
/// significance, per Bailey & Lopez de Prado.
pub fn minimum_backtest_length(target_sharpe: f64, skew: f64, kurtosis: f64, confidence: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).expect("standard normal is always valid");
    let z = normal.inverse_cdf(confidence);
    1.0 + (1.0 - skew * target_sharpe + (kurtosis - 1.0) / 4.0 * target_sharpe.powi(2)) * (z / target_sharpe).powi(2)
}

/// Probability of Backtest Overfitting via random permutations of window
/// orderings. Each permutation is split into two halves; the half with the
/// higher mean in-sample (train) Sharpe is the "selected" group, and we
/// check whether its out-of-sample (test) Sharpe underperforms the overall
/// OOS median — the signature of a choice that looked good in-sample but
/// does not generalize.
pub fn probability_of_backtest_overfitting(results: &[WindowResult], trials: usize, seed: Option<u64>) -> f64 {
    if results.len() < 2 {
        return 0.0;
    }
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };

    let global_oos_median = median(&results.iter().map(|w| w.test.sharpe).collect::<Vec<_>>());
    let indices: Vec<usize> = (0..results.len()).collect();
    let mut overfit_count = 0usize;

    for _ in 0..trials {
        let mut permuted = indices.clone();
        permuted.shuffle(&mut rng);
        let half = permuted.len() / 2;
        let (group_a, group_b) = permuted.split_at(half);

        let is_a = mean(&group_a.iter().map(|&i| results[i].train.sharpe).collect::<Vec<_>>());
        let is_b = mean(&group_b.iter().map(|&i| results[i].train.sharpe).collect::<Vec<_>>());
        let selected = if is_a >= is_b { group_a } else { group_b };

        let oos_selected = median(&selected.iter().map(|&i| results[i].test.sharpe).collect::<Vec<_>>());
        if oos_selected < global_oos_median {
            overfit_count += 1;
        }
    }

    overfit_count as f64 / trials as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Window;
    use chrono::NaiveDate;
    use trading_interfaces::WindowMetrics;

    fn window_result(id: usize, train_sharpe: f64, test_sharpe: f64, ret: f64) -> WindowResult {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        WindowResult {
            window: Window {
                id,
                train_start: d,
                train_end: d,
                test_start: d,
                test_end: d,
            },
            train: WindowMetrics {
                sharpe: train_sharpe,
                calmar: 1.0,
                max_drawdown: 0.1,
                total_return: ret,
                win_rate: 0.5,
                trade_count: 10,
            },
            test: WindowMetrics {
                sharpe: test_sharpe,
                calmar: 1.0,
                max_drawdown: 0.1,
                total_return: ret,
                win_rate: 0.5,
                trade_count: 10,
            },
            degradation: (test_sharpe / train_sharpe.max(EPS)).min(1.0),
            failed: false,
        }
    }

    #[test]
    fn dsr_is_monotone_below_observed_sharpe() {
        let dsr = deflated_sharpe_ratio(1.5, 10);
        assert!(dsr <= 1.5);
    }

    #[test]
    fn dsr_single_trial_matches_sharpe_identity() {
        let dsr = deflated_sharpe_ratio(1.0, 1);
        assert!((dsr - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pbo_robust_case_is_low() {
        // Train and test Sharpe move together window to window: a window
        // that looked good in-sample also looks good out-of-sample.
        let results: Vec<WindowResult> = (0..30)
            .map(|i| {
                let phase = (i as f64) * 0.7;
                let train_sharpe = 1.0 + phase.sin();
                let test_sharpe = 0.5 + 0.4 * phase.sin();
                window_result(i, train_sharpe, test_sharpe, test_sharpe * 0.01)
            })
            .collect();
        let pbo = probability_of_backtest_overfitting(&results, 300, Some(42));
        assert!(pbo < 0.2, "expected low PBO for robust case, got {pbo}");
    }

    #[test]
    fn pbo_overfit_case_is_high() {
        // Train Sharpe looks great exactly where test Sharpe is worst:
        // good in-sample performance is anti-predictive out-of-sample.
        let results: Vec<WindowResult> = (0..30)
            .map(|i| {
                let phase = (i as f64) * 0.7;
                let train_sharpe = 1.0 + phase.sin();
                let test_sharpe = -0.5 * phase.sin();
                window_result(i, train_sharpe, test_sharpe, test_sharpe * 0.01)
            })
            .collect();
        let pbo = probability_of_backtest_overfitting(&results, 300, Some(42));
        assert!(pbo > 0.7, "expected high PBO for overfit case, got {pbo}");
    }

    #[test]
    fn robustness_score_is_bounded() {
        let results: Vec<WindowResult> = (0..10).map(|i| window_result(i, 1.0, 0.8, 0.01)).collect();
        let breakdown = robustness_breakdown(&results);
        assert!((0.0..=100.0).contains(&breakdown.score));
    }
}
