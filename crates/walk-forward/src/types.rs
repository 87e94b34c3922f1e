use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use trading_interfaces::WindowMetrics;

use crate::error::WalkForwardError;

/// Immutable configuration for `validate`.
#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    pub data_start: NaiveDate,
    pub data_end: NaiveDate,
    pub train_months: u32,
    pub test_months: u32,
    pub step_months: u32,
    pub embargo_before_days: i64,
    pub embargo_after_days: i64,
    pub min_windows: usize,
    pub min_profitable_windows_pct: f64,
    pub min_test_sharpe: f64,
    pub max_drawdown_threshold: f64,
    pub min_robustness_score: f64,
    pub seed: Option<u64>,
}

impl WalkForwardConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_start: NaiveDate,
        data_end: NaiveDate,
        train_months: u32,
        test_months: u32,
        step_months: u32,
        embargo_before_days: i64,
        embargo_after_days: i64,
        min_windows: usize,
        min_profitable_windows_pct: f64,
        min_test_sharpe: f64,
        max_drawdown_threshold: f64,
        min_robustness_score: f64,
        seed: Option<u64>,
    ) -> Result<Self, WalkForwardError> {
        if data_start >= data_end {
            return Err(WalkForwardError::InvalidConfig(
                "data_start must be < data_end".into(),
            ));
        }
        if train_months == 0 || test_months == 0 || step_months == 0 {
            return Err(WalkForwardError::InvalidConfig(
                "train_months, test_months, step_months must be >= 1".into(),
            ));
        }
        if embargo_before_days < 0 || embargo_after_days < 0 {
            return Err(WalkForwardError::InvalidConfig(
                "embargo days must be >= 0".into(),
            ));
        }
        if min_windows < 2 {
            return Err(WalkForwardError::InvalidConfig(
                "min_windows must be >= 2".into(),
            ));
        }
        if !(0.0..=1.0).contains(&min_profitable_windows_pct) || min_profitable_windows_pct <= 0.0 {
            return Err(WalkForwardError::InvalidConfig(
                "min_profitable_windows_pct must be in (0, 1]".into(),
            ));
        }
        if min_test_sharpe < 0.0 {
            return Err(WalkForwardError::InvalidConfig(
                "min_test_sharpe must be >= 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&max_drawdown_threshold) || max_drawdown_threshold <= 0.0 {
            return Err(WalkForwardError::InvalidConfig(
                "max_drawdown_threshold must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=100.0).contains(&min_robustness_score) {
            return Err(WalkForwardError::InvalidConfig(
                "min_robustness_score must be in [0, 100]".into(),
            ));
        }
        Ok(Self {
            data_start,
            data_end,
            train_months,
            test_months,
            step_months,
            embargo_before_days,
            embargo_after_days,
            min_windows,
            min_profitable_windows_pct,
            min_test_sharpe,
            max_drawdown_threshold,
            min_robustness_score,
            seed,
        })
    }
}

/// A single train/test split; half-open `[start, end)` UTC dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Window {
    pub id: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowResult {
    pub window: Window,
    pub train: WindowMetrics,
    pub test: WindowMetrics,
    pub degradation: f64,
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    pub robustness_score: f64,
    pub passed: bool,
    pub profitable_windows_pct: f64,
    pub avg_test_sharpe: f64,
    pub avg_test_return: f64,
    pub worst_drawdown: f64,
    pub deflated_sharpe: f64,
    pub pbo: f64,
    pub num_trials: Option<u32>,
    pub paths_tested: Option<u32>,
    pub wall_time_s: f64,
    pub diagnostic: Option<String>,
}
