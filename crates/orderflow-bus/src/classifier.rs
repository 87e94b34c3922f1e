use analysis_core::Bar;
use serde::{Deserialize, Serialize};

use crate::error::OrderflowError;

/// Trade-classification method; selects the rule `TradeClassifier` applies to
/// each incoming bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierMethod {
    TickRule,
    Bvc,
    CloseVsOpen,
}

/// Output of classifying a single bar: a signed side, the bar's volume
/// attributed to that side, and a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeClassification {
    pub side: i8,
    pub volume: f64,
    pub price: f64,
    pub ts_ns: i64,
    pub method: ClassifierMethod,
    pub confidence: f64,
}

/// Stateful per-instrument classifier. Carries at most one scalar of state:
/// the previous close, used by `TickRule` to break ties and to seed the
/// first classification.
#[derive(Debug, Clone)]
pub struct TradeClassifier {
    method: ClassifierMethod,
    prev_price: Option<f64>,
    prev_side: i8,
}

impl TradeClassifier {
    pub fn new(method: ClassifierMethod) -> Self {
        Self {
            method,
            prev_price: None,
            prev_side: 0,
        }
    }

    pub fn classify(&mut self, bar: &Bar) -> Result<TradeClassification, OrderflowError> {
        bar.validate()?;
        let ts_ns = bar.ts_ns();
        let classification = match self.method {
            ClassifierMethod::TickRule => {
                let side = match self.prev_price {
                    Some(prev) if bar.close > prev => 1,
                    Some(prev) if bar.close < prev => -1,
                    Some(_) => self.prev_side,
                    None => 0,
                };
                TradeClassification {
                    side,
                    volume: bar.volume,
                    price: bar.close,
                    ts_ns,
                    method: self.method,
                    confidence: 1.0,
                }
            }
            ClassifierMethod::Bvc => {
                if !bar.high.is_finite() || !bar.low.is_finite() {
                    return Err(OrderflowError::InvalidInput(
                        "BVC classification requires finite high/low".into(),
                    ));
                }
                let range = (bar.high - bar.low).max(f64::EPSILON);
                let buy_ratio = ((bar.close - bar.low) / range).clamp(0.0, 1.0);
                let side = if buy_ratio > 0.5 { 1 } else { -1 };
                TradeClassification {
                    side,
                    volume: bar.volume,
                    price: bar.close,
                    ts_ns,
                    method: self.method,
                    confidence: (buy_ratio - 0.5).abs() * 2.0,
                }
            }
            ClassifierMethod::CloseVsOpen => {
                let side = if bar.close > bar.open {
                    1
                } else if bar.close < bar.open {
                    -1
                } else {
                    0
                };
                TradeClassification {
                    side,
                    volume: bar.volume,
                    price: bar.close,
                    ts_ns,
                    method: self.method,
                    confidence: 1.0,
                }
            }
        };

        self.prev_price = Some(bar.close);
        self.prev_side = classification.side;
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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
    fn tick_rule_reuses_previous_side_on_tie() {
        let mut c = TradeClassifier::new(ClassifierMethod::TickRule);
        let up = c.classify(&bar(10.0, 11.0, 9.0, 10.5, 100.0)).unwrap();
        assert_eq!(up.side, 0);
        let still_up = c.classify(&bar(10.5, 11.0, 10.0, 11.0, 100.0)).unwrap();
        assert_eq!(still_up.side, 1);
        let tie = c.classify(&bar(11.0, 11.5, 10.5, 11.0, 100.0)).unwrap();
        assert_eq!(tie.side, 1);
    }

    #[test]
    fn bvc_confidence_peaks_at_extremes() {
        let mut c = TradeClassifier::new(ClassifierMethod::Bvc);
        let at_high = c.classify(&bar(10.0, 12.0, 10.0, 12.0, 50.0)).unwrap();
        assert_eq!(at_high.side, 1);
        assert!((at_high.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn close_vs_open_sign() {
        let mut c = TradeClassifier::new(ClassifierMethod::CloseVsOpen);
        let down = c.classify(&bar(10.0, 10.5, 8.0, 9.0, 20.0)).unwrap();
        assert_eq!(down.side, -1);
        assert_eq!(down.confidence, 1.0);
    }
}
