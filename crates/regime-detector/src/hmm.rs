use nalgebra::{DMatrix, DVector};
use statrs::distribution::{Continuous, Normal};

use crate::error::RegimeError;

/// Discrete-state, Gaussian-emission HMM over a 1-D observation series
/// (standardized log-returns). Fit by Baum-Welch EM, decoded by Viterbi.
#[derive(Debug, Clone)]
pub struct HiddenMarkovModel {
    k: usize,
    transition: DMatrix<f64>,
    initial: DVector<f64>,
    means: DVector<f64>,
    stds: DVector<f64>,
    fitted: bool,
}

/// Result of decoding the current state from a trailing observation window.
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
    pub state: usize,
    pub posterior: f64,
}

impl HiddenMarkovModel {
    pub fn new(k: usize) -> Result<Self, RegimeError> {
        if !(2..=5).contains(&k) {
            return Err(RegimeError::InvalidConfig(
                "HMM state count must be in 2..=5".into(),
            ));
        }
        let uniform = 1.0 / k as f64;
        Ok(Self {
            k,
            transition: DMatrix::from_element(k, k, uniform),
            initial: DVector::from_element(k, uniform),
            means: DVector::zeros(k),
            stds: DVector::from_element(k, 1.0),
            fitted: false,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn means(&self) -> &DVector<f64> {
        &self.means
    }

    pub fn stds(&self) -> &DVector<f64> {
        &self.stds
    }

    fn emission(&self, state: usize, x: f64) -> f64 {
        let std = self.stds[state].max(1e-6);
        Normal::new(self.means[state], std)
            .map(|n| n.pdf(x).max(1e-300))
            .unwrap_or(1e-300)
    }

    fn init_means(&mut self, observations: &[f64]) {
        let mut sorted = observations.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = sorted.len();
        for (i, mean) in self.means.iter_mut().enumerate() {
            let idx = ((i as f64 + 0.5) / self.k as f64 * n as f64) as usize;
            *mean = sorted[idx.min(n - 1)];
        }
        let overall_mean = observations.iter().sum::<f64>() / n as f64;
        let overall_var = observations
            .iter()
            .map(|x| (x - overall_mean).powi(2))
            .sum::<f64>()
            / n as f64;
        let overall_std = overall_var.sqrt().max(1e-6);
        self.stds.fill(overall_std);
    }

    /// Scaled forward-backward: returns `(alpha, beta, scales, log_likelihood)`.
    fn forward_backward(
        &self,
        observations: &[f64],
    ) -> (Vec<DVector<f64>>, Vec<DVector<f64>>, Vec<f64>, f64) {
        let t_len = observations.len();
        let mut alpha = vec![DVector::zeros(self.k); t_len];
        let mut scales = vec![0.0; t_len];

        for i in 0..self.k {
            alpha[0][i] = self.initial[i] * self.emission(i, observations[0]);
        }
        scales[0] = 1.0 / alpha[0].sum().max(1e-300);
        alpha[0] *= scales[0];

        for t in 1..t_len {
            for j in 0..self.k {
                let mut sum = 0.0;
                for i in 0..self.k {
                    sum += alpha[t - 1][i] * self.transition[(i, j)];
                }
                alpha[t][j] = sum * self.emission(j, observations[t]);
            }
            scales[t] = 1.0 / alpha[t].sum().max(1e-300);
            alpha[t] *= scales[t];
        }

        let mut beta = vec![DVector::from_element(self.k, 1.0); t_len];
        beta[t_len - 1] *= scales[t_len - 1];
        for t in (0..t_len - 1).rev() {
            for i in 0..self.k {
                let mut sum = 0.0;
                for j in 0..self.k {
                    sum += self.transition[(i, j)] * self.emission(j, observations[t + 1]) * beta[t + 1][j];
                }
                beta[t][i] = sum;
            }
            beta[t] *= scales[t];
        }

        let log_likelihood = -scales.iter().map(|c| c.max(1e-300).ln()).sum::<f64>();
        (alpha, beta, scales, log_likelihood)
    }

    pub fn fit(&mut self, observations: &[f64], max_iter: usize) -> Result<(), RegimeError> {
        if observations.len() < 2 * self.k {
            return Err(RegimeError::InsufficientData {
                needed: 2 * self.k,
                have: observations.len(),
            });
        }
        self.init_means(observations);

        let mut prev_ll = f64::NEG_INFINITY;
        for _ in 0..max_iter.max(1) {
            let (alpha, beta, _scales, ll) = self.forward_backward(observations);
            let t_len = observations.len();

            let mut gamma = vec![DVector::zeros(self.k); t_len];
            for t in 0..t_len {
                let mut row = alpha[t].component_mul(&beta[t]);
                let sum = row.sum().max(1e-300);
                row /= sum;
                gamma[t] = row;
            }

            let mut xi_sum = DMatrix::zeros(self.k, self.k);
            let mut gamma_sum_excl_last = DVector::zeros(self.k);
            for t in 0..t_len - 1 {
                let mut xi_t = DMatrix::zeros(self.k, self.k);
                let mut total = 0.0;
                for i in 0..self.k {
                    for j in 0..self.k {
                        let v = alpha[t][i]
                            * self.transition[(i, j)]
                            * self.emission(j, observations[t + 1])
                            * beta[t + 1][j];
                        xi_t[(i, j)] = v;
                        total += v;
                    }
                }
                let total = total.max(1e-300);
                xi_sum += xi_t / total;
                gamma_sum_excl_last += &gamma[t];
            }

            self.initial = gamma[0].clone();
            for i in 0..self.k {
                let denom = gamma_sum_excl_last[i].max(1e-300);
                for j in 0..self.k {
                    self.transition[(i, j)] = xi_sum[(i, j)] / denom;
                }
            }

            for i in 0..self.k {
                let denom: f64 = gamma.iter().map(|g| g[i]).sum::<f64>().max(1e-300);
                let mean = gamma
                    .iter()
                    .zip(observations.iter())
                    .map(|(g, x)| g[i] * x)
                    .sum::<f64>()
                    / denom;
                let var = gamma
                    .iter()
                    .zip(observations.iter())
                    .map(|(g, x)| g[i] * (x - mean).powi(2))
                    .sum::<f64>()
                    / denom;
                self.means[i] = mean;
                self.stds[i] = var.sqrt().max(1e-6);
            }

            if (ll - prev_ll).abs() < 1e-6 {
                prev_ll = ll;
                break;
            }
            prev_ll = ll;
        }
        let _ = prev_ll;
        self.fitted = true;
        Ok(())
    }

    /// Viterbi-decode the most likely state at the end of `observations`,
    /// paired with the smoothed posterior probability of that state.
    pub fn decode(&self, observations: &[f64]) -> Option<Decoded> {
        if !self.fitted || observations.is_empty() {
            return None;
        }
        let t_len = observations.len();
        let log_initial: Vec<f64> = self.initial.iter().map(|p| p.max(1e-300).ln()).collect();
        let log_trans: Vec<Vec<f64>> = (0..self.k)
            .map(|i| (0..self.k).map(|j| self.transition[(i, j)].max(1e-300).ln()).collect())
            .collect();

        let mut delta = vec![vec![0.0; self.k]; t_len];
        let mut psi = vec![vec![0usize; self.k]; t_len];

        for i in 0..self.k {
            delta[0][i] = log_initial[i] + self.emission(i, observations[0]).max(1e-300).ln();
        }
        for t in 1..t_len {
            for j in 0..self.k {
                let (best_i, best_val) = (0..self.k)
                    .map(|i| (i, delta[t - 1][i] + log_trans[i][j]))
                    .fold((0usize, f64::NEG_INFINITY), |acc, cur| {
                        if cur.1 > acc.1 {
                            cur
                        } else {
                            acc
                        }
                    });
                psi[t][j] = best_i;
                delta[t][j] = best_val + self.emission(j, observations[t]).max(1e-300).ln();
            }
        }

        let last = &delta[t_len - 1];
        let (best_state, _) = last
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |acc, (i, &v)| {
                if v > acc.1 {
                    (i, v)
                } else {
                    acc
                }
            });

        let max_log = last.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let sum_exp: f64 = last.iter().map(|v| (v - max_log).exp()).sum();
        let posterior = ((last[best_state] - max_log).exp() / sum_exp.max(1e-300)).clamp(0.0, 1.0);

        Some(Decoded {
            state: best_state,
            posterior,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_two_regime_series() -> Vec<f64> {
        let mut data = Vec::new();
        for i in 0..120 {
            let base = if (i / 20) % 2 == 0 { 1.0 } else { -1.0 };
            let wobble = ((i as f64) * 0.37).sin() * 0.05;
            data.push(base + wobble);
        }
        data
    }

    #[test]
    fn fits_and_decodes_without_panicking() {
        let mut hmm = HiddenMarkovModel::new(2).unwrap();
        let data = synthetic_two_regime_series();
        hmm.fit(&data, 25).unwrap();
        assert!(hmm.is_fitted());
        let decoded = hmm.decode(&data[90..]).unwrap();
        assert!(decoded.state < 2);
        assert!((0.0..=1.0).contains(&decoded.posterior));
    }

    #[test]
    fn rejects_invalid_k() {
        assert!(HiddenMarkovModel::new(1).is_err());
        assert!(HiddenMarkovModel::new(6).is_err());
    }

    #[test]
    fn insufficient_observations_errors() {
        let mut hmm = HiddenMarkovModel::new(3).unwrap();
        assert!(hmm.fit(&[0.1, 0.2], 10).is_err());
    }
}
