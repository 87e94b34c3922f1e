use crate::error::RegimeError;

const K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VolLabel {
    Low,
    Medium,
    High,
}

/// Fixed-K=3 Gaussian mixture over a rolling realized-volatility series,
/// fit by EM. Components are labeled LOW/MEDIUM/HIGH by sorted mean.
#[derive(Debug, Clone)]
pub struct VolatilityGmm {
    means: [f64; K],
    stds: [f64; K],
    weights: [f64; K],
    fitted: bool,
}

impl Default for VolatilityGmm {
    fn default() -> Self {
        Self {
            means: [0.0; K],
            stds: [1.0; K],
            weights: [1.0 / K as f64; K],
            fitted: false,
        }
    }
}

impl VolatilityGmm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn density(&self, k: usize, x: f64) -> f64 {
        let std = self.stds[k].max(1e-9);
        let z = (x - self.means[k]) / std;
        (-0.5 * z * z).exp() / (std * (2.0 * std::f64::consts::PI).sqrt())
    }

    pub fn fit(&mut self, volatilities: &[f64], max_iter: usize) -> Result<(), RegimeError> {
        if volatilities.len() < 2 * K {
            return Err(RegimeError::InsufficientData {
                needed: 2 * K,
                have: volatilities.len(),
            });
        }
        let mut sorted = volatilities.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = sorted.len();
        let overall_mean = volatilities.iter().sum::<f64>() / n as f64;
        let overall_std = (volatilities.iter().map(|v| (v - overall_mean).powi(2)).sum::<f64>() / n as f64)
            .sqrt()
            .max(1e-6);
        for (k, mean) in self.means.iter_mut().enumerate() {
            let idx = ((k as f64 + 0.5) / K as f64 * n as f64) as usize;
            *mean = sorted[idx.min(n - 1)];
        }
        self.stds = [overall_std; K];
        self.weights = [1.0 / K as f64; K];

        for _ in 0..max_iter.max(1) {
            let mut resp = vec![[0.0; K]; n];
            for (t, &x) in volatilities.iter().enumerate() {
                let mut total = 0.0;
                for k in 0..K {
                    resp[t][k] = self.weights[k] * self.density(k, x);
                    total += resp[t][k];
                }
                let total = total.max(1e-300);
                for k in 0..K {
                    resp[t][k] /= total;
                }
            }

            for k in 0..K {
                let nk: f64 = resp.iter().map(|r| r[k]).sum::<f64>().max(1e-300);
                let mean = resp
                    .iter()
                    .zip(volatilities.iter())
                    .map(|(r, x)| r[k] * x)
                    .sum::<f64>()
                    / nk;
                let var = resp
                    .iter()
                    .zip(volatilities.iter())
                    .map(|(r, x)| r[k] * (x - mean).powi(2))
                    .sum::<f64>()
                    / nk;
                self.means[k] = mean;
                self.stds[k] = var.sqrt().max(1e-6);
                self.weights[k] = nk / n as f64;
            }
        }
        self.fitted = true;
        Ok(())
    }

    /// Classifies `x` as LOW/MEDIUM/HIGH by sorting components ascending by mean.
    pub fn classify(&self, x: f64) -> Option<(VolLabel, f64)> {
        if !self.fitted {
            return None;
        }
        let mut order: Vec<usize> = (0..K).collect();
        order.sort_by(|&a, &b| self.means[a].partial_cmp(&self.means[b]).unwrap());
        let labels = [VolLabel::Low, VolLabel::Medium, VolLabel::High];

        let densities: Vec<f64> = (0..K).map(|k| self.weights[k] * self.density(k, x)).collect();
        let total: f64 = densities.iter().sum::<f64>().max(1e-300);
        let best_k = densities
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |acc, (k, &d)| if d > acc.1 { (k, d) } else { acc })
            .0;
        let rank = order.iter().position(|&k| k == best_k).unwrap();
        let confidence = (densities[best_k] / total).clamp(0.0, 1.0);
        Some((labels[rank], confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_cluster_series() -> Vec<f64> {
        let mut data = Vec::new();
        for i in 0..90 {
            let base = match i % 3 {
                0 => 0.01,
                1 => 0.05,
                _ => 0.15,
            };
            data.push(base + ((i as f64) * 0.11).sin() * 0.002);
        }
        data
    }

    #[test]
    fn fits_and_labels_ascending() {
        let mut gmm = VolatilityGmm::new();
        gmm.fit(&three_cluster_series(), 50).unwrap();
        let (label_low, _) = gmm.classify(0.01).unwrap();
        let (label_high, _) = gmm.classify(0.15).unwrap();
        assert_eq!(label_low, VolLabel::Low);
        assert_eq!(label_high, VolLabel::High);
    }

    #[test]
    fn insufficient_observations_errors() {
        let mut gmm = VolatilityGmm::new();
        assert!(gmm.fit(&[0.1, 0.2], 10).is_err());
    }
}
