use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classifier::TradeClassification;
use crate::error::OrderflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HawkesState {
    Empty,
    Buffering,
    Fitted,
}

#[derive(Debug, Clone)]
pub struct HawkesConfig {
    pub lookback_ticks: usize,
    pub refit_interval: u64,
    pub beta: f64,
    pub min_events: usize,
    /// Fixed `(mu_buy, mu_sell)`, bypassing the fitter's baseline estimate.
    pub fixed_baseline: Option<(f64, f64)>,
    /// Fixed `(alpha_buy, alpha_sell)`, bypassing the fitter's excitation estimate.
    pub fixed_excitation: Option<(f64, f64)>,
}

impl HawkesConfig {
    pub fn new(
        lookback_ticks: usize,
        refit_interval: u64,
        beta: f64,
        min_events: usize,
        fixed_baseline: Option<(f64, f64)>,
        fixed_excitation: Option<(f64, f64)>,
    ) -> Result<Self, OrderflowError> {
        if !(100..=100_000).contains(&lookback_ticks) {
            return Err(OrderflowError::InvalidConfig(
                "lookback_ticks must be in [100, 100000]".into(),
            ));
        }
        if refit_interval < 10 {
            return Err(OrderflowError::InvalidConfig(
                "refit_interval must be >= 10".into(),
            ));
        }
        if beta <= 0.0 {
            return Err(OrderflowError::InvalidConfig("beta must be > 0".into()));
        }
        if min_events == 0 {
            return Err(OrderflowError::InvalidConfig(
                "min_events must be > 0".into(),
            ));
        }
        Ok(Self {
            lookback_ticks,
            refit_interval,
            beta,
            min_events,
            fixed_baseline,
            fixed_excitation,
        })
    }
}

/// Self-exciting bivariate Hawkes process tracking buy/sell tick intensity.
/// Each side's intensity decays exponentially and jumps on its own arrivals
/// only (no cross-excitation between buy and sell, per spec).
pub struct HawkesOFI {
    config: HawkesConfig,
    state: HawkesState,
    buy_ring: VecDeque<i64>,
    sell_ring: VecDeque<i64>,
    mu_buy: f64,
    mu_sell: f64,
    alpha_buy: f64,
    alpha_sell: f64,
    beta: f64,
    decayed_buy: f64,
    decayed_sell: f64,
    last_update_ns: Option<i64>,
    last_fit_ns: Option<i64>,
    ticks_since_fit: u64,
}

impl HawkesOFI {
    pub fn new(config: HawkesConfig) -> Self {
        let beta = config.beta;
        Self {
            config,
            state: HawkesState::Empty,
            buy_ring: VecDeque::new(),
            sell_ring: VecDeque::new(),
            mu_buy: 0.0,
            mu_sell: 0.0,
            alpha_buy: 0.0,
            alpha_sell: 0.0,
            beta,
            decayed_buy: 0.0,
            decayed_sell: 0.0,
            last_update_ns: None,
            last_fit_ns: None,
            ticks_since_fit: 0,
        }
    }

    pub fn handle_classification(&mut self, classification: &TradeClassification) {
        if classification.side == 0 {
            return;
        }
        let ts_ns = classification.ts_ns;
        self.decay_to(ts_ns);

        match classification.side {
            1 => {
                self.buy_ring.push_back(ts_ns);
                if self.buy_ring.len() > self.config.lookback_ticks {
                    self.buy_ring.pop_front();
                }
                self.decayed_buy += 1.0;
            }
            -1 => {
                self.sell_ring.push_back(ts_ns);
                if self.sell_ring.len() > self.config.lookback_ticks {
                    self.sell_ring.pop_front();
                }
                self.decayed_sell += 1.0;
            }
            _ => unreachable!("side == 0 handled above"),
        }
        self.last_update_ns = Some(ts_ns);

        if self.state == HawkesState::Empty {
            self.state = HawkesState::Buffering;
        }

        self.ticks_since_fit += 1;
        if self.ticks_since_fit >= self.config.refit_interval {
            self.ticks_since_fit = 0;
            if self.attempt_fit(ts_ns) {
                self.state = HawkesState::Fitted;
                self.last_fit_ns = Some(ts_ns);
            } else {
                warn!("hawkes refit did not converge, staying in Buffering");
                self.state = HawkesState::Buffering;
            }
        }
    }

    fn decay_to(&mut self, ts_ns: i64) {
        if let Some(prev) = self.last_update_ns {
            let dt = ((ts_ns - prev).max(0) as f64) / 1e9;
            let decay = (-self.beta * dt).exp();
            self.decayed_buy *= decay;
            self.decayed_sell *= decay;
        }
    }

    fn attempt_fit(&mut self, now_ns: i64) -> bool {
        if self.buy_ring.len() < self.config.min_events || self.sell_ring.len() < self.config.min_events {
            return false;
        }

        let (mut mu_buy, mut mu_sell) = self.config.fixed_baseline.unwrap_or((0.0, 0.0));
        let (mut alpha_buy, mut alpha_sell) = self.config.fixed_excitation.unwrap_or((0.0, 0.0));

        if self.config.fixed_baseline.is_none() || self.config.fixed_excitation.is_none() {
            let branching_ratio = 0.5;
            let rate_buy = Self::empirical_rate(&self.buy_ring);
            let rate_sell = Self::empirical_rate(&self.sell_ring);
            let (fit_mu_buy, fit_alpha_buy) = match (rate_buy, self.config.fixed_excitation) {
                (Some(rate), None) => (rate * (1.0 - branching_ratio), branching_ratio * self.beta),
                (Some(rate), Some((a, _))) => (rate * (1.0 - branching_ratio), a),
                (None, _) => return false,
            };
            let (fit_mu_sell, fit_alpha_sell) = match (rate_sell, self.config.fixed_excitation) {
                (Some(rate), None) => (rate * (1.0 - branching_ratio), branching_ratio * self.beta),
                (Some(rate), Some((_, a))) => (rate * (1.0 - branching_ratio), a),
                (None, _) => return false,
            };
            if self.config.fixed_baseline.is_none() {
                mu_buy = fit_mu_buy;
                mu_sell = fit_mu_sell;
            }
            if self.config.fixed_excitation.is_none() {
                alpha_buy = fit_alpha_buy;
                alpha_sell = fit_alpha_sell;
            }
        }

        if alpha_buy >= self.beta {
            alpha_buy = 0.99 * self.beta;
        }
        if alpha_sell >= self.beta {
            alpha_sell = 0.99 * self.beta;
        }
        if !mu_buy.is_finite() || !mu_sell.is_finite() || mu_buy < 0.0 || mu_sell < 0.0 {
            return false;
        }

        self.mu_buy = mu_buy;
        self.mu_sell = mu_sell;
        self.alpha_buy = alpha_buy;
        self.alpha_sell = alpha_sell;
        let _ = now_ns;
        true
    }

    fn empirical_rate(ring: &VecDeque<i64>) -> Option<f64> {
        if ring.len() < 2 {
            return None;
        }
        let first = *ring.front().unwrap();
        let last = *ring.back().unwrap();
        let duration_s = ((last - first).max(1) as f64) / 1e9;
        Some((ring.len() - 1) as f64 / duration_s)
    }

    pub fn is_fitted(&self) -> bool {
        self.state == HawkesState::Fitted
    }

    pub fn state(&self) -> HawkesState {
        self.state
    }

    pub fn ofi(&self) -> f64 {
        if self.state != HawkesState::Fitted {
            return 0.0;
        }
        let lambda_buy = self.mu_buy + self.alpha_buy * self.decayed_buy;
        let lambda_sell = self.mu_sell + self.alpha_sell * self.decayed_sell;
        let denom = (lambda_buy + lambda_sell).max(f64::EPSILON);
        ((lambda_buy - lambda_sell) / denom).clamp(-1.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.state = HawkesState::Empty;
        self.buy_ring.clear();
        self.sell_ring.clear();
        self.mu_buy = 0.0;
        self.mu_sell = 0.0;
        self.alpha_buy = 0.0;
        self.alpha_sell = 0.0;
        self.decayed_buy = 0.0;
        self.decayed_sell = 0.0;
        self.last_update_ns = None;
        self.last_fit_ns = None;
        self.ticks_since_fit = 0;
    }
}
