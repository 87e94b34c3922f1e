use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierMethod, TradeClassification};
use crate::error::OrderflowError;

/// A single volume bucket, filling until `accumulated_volume >= target_volume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeBucket {
    pub target_volume: f64,
    pub accumulated_volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub start_ns: i64,
    pub end_ns: Option<i64>,
}

impl VolumeBucket {
    fn new(target_volume: f64, start_ns: i64) -> Self {
        Self {
            target_volume,
            accumulated_volume: 0.0,
            buy_volume: 0.0,
            sell_volume: 0.0,
            start_ns,
            end_ns: None,
        }
    }

    fn is_complete(&self) -> bool {
        self.accumulated_volume >= self.target_volume
    }

    fn order_imbalance(&self) -> f64 {
        let total = self.buy_volume + self.sell_volume;
        if total <= 0.0 {
            0.0
        } else {
            (self.buy_volume - self.sell_volume).abs() / total
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToxicityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct VPINConfig {
    pub bucket_volume: f64,
    pub n_buckets: usize,
    pub min_bucket_volume: f64,
    pub classifier_method: ClassifierMethod,
}

impl VPINConfig {
    pub fn new(
        bucket_volume: f64,
        n_buckets: usize,
        min_bucket_volume: f64,
        classifier_method: ClassifierMethod,
    ) -> Result<Self, OrderflowError> {
        if bucket_volume <= 0.0 {
            return Err(OrderflowError::InvalidConfig(
                "bucket_volume must be > 0".into(),
            ));
        }
        if !(10..=200).contains(&n_buckets) {
            return Err(OrderflowError::InvalidConfig(
                "n_buckets must be in [10, 200]".into(),
            ));
        }
        if min_bucket_volume < 0.0 {
            return Err(OrderflowError::InvalidConfig(
                "min_bucket_volume must be >= 0".into(),
            ));
        }
        Ok(Self {
            bucket_volume,
            n_buckets,
            min_bucket_volume,
            classifier_method,
        })
    }
}

/// Streaming VPIN (Volume-Synchronized Probability of Informed Trading).
/// Consumes `TradeClassification`s produced by a classifier the caller owns
/// (the Orderflow Bus shares one `TradeClassifier` across VPIN and Hawkes),
/// rather than classifying bars itself.
pub struct VPINEngine {
    config: VPINConfig,
    current: Option<VolumeBucket>,
    ring: VecDeque<f64>,
}

impl VPINEngine {
    pub fn new(config: VPINConfig) -> Self {
        Self {
            config,
            current: None,
            ring: VecDeque::new(),
        }
    }

    pub fn handle_classification(&mut self, classification: &TradeClassification) -> Result<(), OrderflowError> {
        if classification.volume <= 0.0 {
            return Ok(());
        }
        let mut remaining = classification.volume;
        let ts_ns = classification.ts_ns;

        while remaining > 0.0 {
            let bucket = self
                .current
                .get_or_insert_with(|| VolumeBucket::new(self.config.bucket_volume, ts_ns));

            let space = (bucket.target_volume - bucket.accumulated_volume).max(0.0);
            let portion = remaining.min(space);

            let (buy_add, sell_add) = match classification.side {
                1 => (portion, 0.0),
                -1 => (0.0, portion),
                _ => (portion / 2.0, portion / 2.0),
            };
            bucket.buy_volume += buy_add;
            bucket.sell_volume += sell_add;
            bucket.accumulated_volume += portion;
            remaining -= portion;

            if bucket.is_complete() {
                let mut sealed = self.current.take().unwrap();
                sealed.end_ns = Some(ts_ns);
                let oi = if sealed.accumulated_volume < self.config.min_bucket_volume {
                    0.0
                } else {
                    sealed.order_imbalance()
                };
                self.ring.push_back(oi);
                if self.ring.len() > self.config.n_buckets {
                    self.ring.pop_front();
                }
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.ring.len() >= self.config.n_buckets
    }

    pub fn value(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.ring.iter().sum::<f64>() / self.ring.len() as f64
    }

    pub fn bucket_count(&self) -> usize {
        self.ring.len()
    }

    pub fn toxicity_level(&self) -> ToxicityLevel {
        let v = self.value();
        if v < 0.3 {
            ToxicityLevel::Low
        } else if v < 0.7 {
            ToxicityLevel::Medium
        } else {
            ToxicityLevel::High
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.ring.clear();
    }
}
