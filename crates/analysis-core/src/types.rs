use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// OHLCV bar data, monotone in `timestamp` within a single instrument's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

impl Bar {
    /// Nanosecond timestamp used by components that reason about elapsed time
    /// rather than calendar dates (VPIN bucket sealing, Hawkes intensity decay).
    pub fn ts_ns(&self) -> i64 {
        self.timestamp.timestamp_nanos_opt().unwrap_or(0)
    }

    /// Checks OHLCV internal consistency: all fields finite, `high` the max
    /// and `low` the min of the four prices, `volume` non-negative.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if ![self.open, self.high, self.low, self.close, self.volume]
            .into_iter()
            .all(f64::is_finite)
        {
            return Err(AnalysisError::InvalidInput(
                "bar fields must be finite".into(),
            ));
        }
        if self.high < self.low
            || self.high < self.open
            || self.high < self.close
            || self.low > self.open
            || self.low > self.close
        {
            return Err(AnalysisError::InvalidInput(
                "bar high/low must bound open/close".into(),
            ));
        }
        if self.volume < 0.0 {
            return Err(AnalysisError::InvalidInput("volume must be >= 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: Utc::now(),
            open,
            high,
            low,
            close,
            volume,
            vwap: None,
        }
    }

    #[test]
    fn validate_accepts_consistent_bar() {
        assert!(bar(10.0, 11.0, 9.0, 10.5, 100.0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_high_below_low() {
        assert!(bar(10.0, 9.0, 11.0, 10.0, 100.0).validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_volume() {
        assert!(bar(10.0, 11.0, 9.0, 10.0, -1.0).validate().is_err());
    }

    #[test]
    fn validate_rejects_non_finite_field() {
        assert!(bar(10.0, f64::NAN, 9.0, 10.0, 100.0).validate().is_err());
    }
}
