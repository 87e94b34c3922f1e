use std::collections::VecDeque;

use analysis_core::Bar;

use crate::error::RegimeError;
use crate::gmm::VolatilityGmm;
use crate::hmm::HiddenMarkovModel;
use crate::types::{gmm_weight, hmm_weight, RegimeClassification, RegimeLabel};

#[derive(Debug, Clone)]
pub struct RegimeDetectorConfig {
    /// HMM state count, 2..=5.
    pub k: usize,
    /// Minimum observations required to fit; below this, classification
    /// returns `Unknown`/`confidence=0`/`regime_weight=0.5`.
    pub min_fit_obs: usize,
    pub refit_interval: u64,
    pub trailing_window: usize,
    pub vol_window: usize,
}

impl Default for RegimeDetectorConfig {
    fn default() -> Self {
        Self {
            k: 3,
            min_fit_obs: 100,
            refit_interval: 50,
            trailing_window: 250,
            vol_window: 20,
        }
    }
}

impl RegimeDetectorConfig {
    pub fn new(
        k: usize,
        min_fit_obs: usize,
        refit_interval: u64,
        trailing_window: usize,
        vol_window: usize,
    ) -> Result<Self, RegimeError> {
        if min_fit_obs < 100 {
            return Err(RegimeError::InvalidConfig(
                "min_fit_obs must be >= 100".into(),
            ));
        }
        if refit_interval == 0 {
            return Err(RegimeError::InvalidConfig(
                "refit_interval must be > 0".into(),
            ));
        }
        if trailing_window < min_fit_obs {
            return Err(RegimeError::InvalidConfig(
                "trailing_window must be >= min_fit_obs".into(),
            ));
        }
        if vol_window < 2 {
            return Err(RegimeError::InvalidConfig("vol_window must be >= 2".into()));
        }
        Ok(Self {
            k,
            min_fit_obs,
            refit_interval,
            trailing_window,
            vol_window,
        })
    }
}

/// Combines an HMM over standardized log-returns with a GMM over rolling
/// realized volatility. Fit once a historical window is available, then
/// refit every `refit_interval` bars (streaming mode).
pub struct RegimeDetector {
    config: RegimeDetectorConfig,
    hmm: HiddenMarkovModel,
    gmm: VolatilityGmm,
    returns: VecDeque<f64>,
    prev_close: Option<f64>,
    ticks_since_fit: u64,
}

impl RegimeDetector {
    pub fn new(config: RegimeDetectorConfig) -> Result<Self, RegimeError> {
        let hmm = HiddenMarkovModel::new(config.k)?;
        Ok(Self {
            config,
            hmm,
            gmm: VolatilityGmm::new(),
            returns: VecDeque::new(),
            prev_close: None,
            ticks_since_fit: 0,
        })
    }

    pub fn handle_bar(&mut self, bar: &Bar) -> Result<RegimeClassification, RegimeError> {
        if let Some(prev) = self.prev_close {
            if prev > 0.0 && bar.close > 0.0 {
                let log_return = (bar.close / prev).ln();
                self.returns.push_back(log_return);
                if self.returns.len() > self.config.trailing_window {
                    self.returns.pop_front();
                }
            }
        }
        self.prev_close = Some(bar.close);
        self.ticks_since_fit += 1;

        if self.returns.len() >= self.config.min_fit_obs
            && (!self.hmm.is_fitted() || self.ticks_since_fit >= self.config.refit_interval)
        {
            self.ticks_since_fit = 0;
            let window: Vec<f64> = self.returns.iter().copied().collect();
            let standardized = standardize(&window);
            if self.hmm.fit(&standardized, 25).is_ok() {
                let vols = rolling_vol(&window, self.config.vol_window);
                if vols.len() >= 6 {
                    let _ = self.gmm.fit(&vols, 25);
                }
            }
        }

        Ok(self.classify())
    }

    pub fn classify(&self) -> RegimeClassification {
        if !self.hmm.is_fitted() || self.returns.len() < self.config.min_fit_obs {
            return RegimeClassification {
                label: RegimeLabel::Unknown,
                confidence: 0.0,
                regime_weight: 0.5,
            };
        }

        let window: Vec<f64> = self.returns.iter().copied().collect();
        let standardized = standardize(&window);
        let Some(decoded) = self.hmm.decode(&standardized) else {
            return RegimeClassification {
                label: RegimeLabel::Unknown,
                confidence: 0.0,
                regime_weight: 0.5,
            };
        };
        let label = self.classify_state(decoded.state);

        let vol_label = if self.gmm.is_fitted() {
            rolling_vol(&window, self.config.vol_window)
                .last()
                .and_then(|&v| self.gmm.classify(v))
        } else {
            None
        };

        let weight = (hmm_weight(label) * vol_label.map(|(l, _)| gmm_weight(l)).unwrap_or(1.0))
            .clamp(0.0, 1.0);

        RegimeClassification {
            label,
            confidence: decoded.posterior,
            regime_weight: weight,
        }
    }

    /// Maps a raw HMM state to a regime label. State order from EM fitting
    /// is arbitrary, so this ranks states by fitted mean/std rather than
    /// index: the highest-std state is Volatile; among the rest, the
    /// highest-mean state is trending up, the lowest trending down, and
    /// anything near the average is ranging.
    fn classify_state(&self, state: usize) -> RegimeLabel {
        let k = self.hmm.k();
        if k == 1 {
            return RegimeLabel::Ranging;
        }
        let means: Vec<f64> = (0..k).map(|i| self.hmm.means()[i]).collect();
        let stds: Vec<f64> = (0..k).map(|i| self.hmm.stds()[i]).collect();

        let (volatile_state, _) = stds
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |acc, (i, &s)| {
                if s > acc.1 {
                    (i, s)
                } else {
                    acc
                }
            });
        if state == volatile_state {
            return RegimeLabel::Volatile;
        }

        let overall_mean = means.iter().sum::<f64>() / k as f64;
        let max_mean = means.iter().cloned().fold(f64::MIN, f64::max);
        let min_mean = means.iter().cloned().fold(f64::MAX, f64::min);
        let spread = (max_mean - min_mean).max(1e-9);
        let rel = (means[state] - overall_mean) / spread;

        if rel > 0.15 {
            RegimeLabel::TrendingUp
        } else if rel < -0.15 {
            RegimeLabel::TrendingDown
        } else {
            RegimeLabel::Ranging
        }
    }

    pub fn reset(&mut self) {
        self.returns.clear();
        self.prev_close = None;
        self.ticks_since_fit = 0;
        self.hmm = HiddenMarkovModel::new(self.config.k).expect("k already validated");
        self.gmm = VolatilityGmm::new();
    }
}

fn standardize(xs: &[f64]) -> Vec<f64> {
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
    let std = var.sqrt().max(1e-9);
    xs.iter().map(|x| (x - mean) / std).collect()
}

fn rolling_vol(returns: &[f64], window: usize) -> Vec<f64> {
    if returns.len() < window {
        return Vec::new();
    }
    (window..=returns.len())
        .map(|end| {
            let slice = &returns[end - window..end];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let var = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / window as f64;
            var.sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(close: f64) -> Bar {
        Bar {
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
            vwap: None,
        }
    }

    #[test]
    fn below_min_fit_obs_returns_unknown() {
        let config = RegimeDetectorConfig::new(3, 100, 50, 250, 20).unwrap();
        let mut detector = RegimeDetector::new(config).unwrap();
        for i in 0..10 {
            let classification = detector
                .handle_bar(&bar(100.0 + i as f64))
                .unwrap();
            assert_eq!(classification.label, RegimeLabel::Unknown);
            assert_eq!(classification.confidence, 0.0);
            assert_eq!(classification.regime_weight, 0.5);
        }
    }

    #[test]
    fn fits_after_enough_observations_and_classifies() {
        let config = RegimeDetectorConfig::new(2, 100, 40, 250, 10).unwrap();
        let mut detector = RegimeDetector::new(config).unwrap();
        let mut price = 100.0;
        let mut last = RegimeLabel::Unknown;
        for i in 0..220 {
            let drift = if (i / 30) % 2 == 0 { 0.6 } else { -0.6 };
            price += drift + ((i as f64) * 0.31).sin() * 0.1;
            let classification = detector.handle_bar(&bar(price)).unwrap();
            last = classification.label;
            assert!((0.0..=1.0).contains(&classification.confidence));
            assert!((0.0..=1.0).contains(&classification.regime_weight));
        }
        assert_ne!(last, RegimeLabel::Unknown);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(RegimeDetectorConfig::new(3, 50, 10, 250, 20).is_err());
        assert!(RegimeDetectorConfig::new(3, 100, 0, 250, 20).is_err());
        assert!(RegimeDetectorConfig::new(3, 100, 10, 50, 20).is_err());
    }
}
