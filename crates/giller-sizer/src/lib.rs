pub mod error;

pub use error::SizerError;

use serde::{Deserialize, Serialize};

/// Output of `GillerSizer::size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSize {
    pub size: f64,
    pub reasoning: String,
}

/// Giller-style sub-linear position sizer:
/// `size = base · |signal|^p · regime_weight · (1 − toxicity)`. `size` is a
/// magnitude (always `≥ 0`); the caller derives order direction from
/// `signal`'s own sign separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GillerSizer {
    /// Per-trade risk budget; the size at `|signal|=1, regime_weight=1, toxicity=0`.
    pub base: f64,
    /// Sub-linear exponent, default `0.5`.
    pub p: f64,
}

impl Default for GillerSizer {
    fn default() -> Self {
        Self { base: 1.0, p: 0.5 }
    }
}

impl GillerSizer {
    pub fn new(base: f64, p: f64) -> Result<Self, SizerError> {
        if base <= 0.0 {
            return Err(SizerError::InvalidConfig("base must be > 0".into()));
        }
        if p <= 0.0 {
            return Err(SizerError::InvalidConfig("p must be > 0".into()));
        }
        Ok(Self { base, p })
    }

    pub fn size(&self, signal: f64, regime_weight: f64, toxicity: f64) -> PositionSize {
        let regime_weight = regime_weight.clamp(0.0, 1.0);
        let toxicity = toxicity.clamp(0.0, 1.0);

        let magnitude = signal.abs().powf(self.p);
        let size = self.base * magnitude * regime_weight * (1.0 - toxicity);

        let reasoning = format!(
            "base={:.4} * |{signal:.4}|^{:.2} * regime_weight={regime_weight:.2} * (1-toxicity={toxicity:.2}) = {size:.4}",
            self.base, self.p
        );

        PositionSize { size, reasoning }
    }
}
