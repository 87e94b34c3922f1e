use serde::{Deserialize, Serialize};

use crate::gmm::VolLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeLabel {
    TrendingUp,
    TrendingDown,
    Ranging,
    Volatile,
    Unknown,
}

/// Output of `RegimeDetector::classify`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeClassification {
    pub label: RegimeLabel,
    pub confidence: f64,
    pub regime_weight: f64,
}

pub(crate) fn hmm_weight(label: RegimeLabel) -> f64 {
    match label {
        RegimeLabel::TrendingUp | RegimeLabel::TrendingDown => 1.0,
        RegimeLabel::Ranging => 0.5,
        RegimeLabel::Volatile => 0.3,
        RegimeLabel::Unknown => 0.5,
    }
}

pub(crate) fn gmm_weight(label: VolLabel) -> f64 {
    match label {
        VolLabel::Low => 1.0,
        VolLabel::Medium => 0.7,
        VolLabel::High => 0.4,
    }
}
