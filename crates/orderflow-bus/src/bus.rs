use analysis_core::Bar;

use crate::classifier::TradeClassifier;
use crate::error::OrderflowError;
use crate::hawkes::{HawkesConfig, HawkesOFI};
use crate::vpin::{ToxicityLevel, VPINConfig, VPINEngine};

pub struct OrderflowBusConfig {
    pub vpin: Option<VPINConfig>,
    pub hawkes: Option<HawkesConfig>,
}

/// Thin facade composing the trade classifier, VPIN, and Hawkes OFI. Either
/// side may be disabled independently; `handle_bar` classifies once and
/// forwards the classification to whichever side is enabled.
pub struct OrderflowBus {
    classifier: TradeClassifier,
    vpin: Option<VPINEngine>,
    hawkes: Option<HawkesOFI>,
}

impl OrderflowBus {
    pub fn new(config: OrderflowBusConfig) -> Self {
        let method = config
            .vpin
            .as_ref()
            .map(|v| v.classifier_method)
            .unwrap_or(crate::classifier::ClassifierMethod::TickRule);
        Self {
            classifier: TradeClassifier::new(method),
            vpin: config.vpin.map(VPINEngine::new),
            hawkes: config.hawkes.map(HawkesOFI::new),
        }
    }

    pub fn handle_bar(&mut self, bar: &Bar) -> Result<(), OrderflowError> {
        if bar.volume <= 0.0 {
            return Ok(());
        }
        let classification = self.classifier.classify(bar)?;
        if let Some(vpin) = self.vpin.as_mut() {
            vpin.handle_classification(&classification)?;
        }
        if let Some(hawkes) = self.hawkes.as_mut() {
            hawkes.handle_classification(&classification);
        }
        Ok(())
    }

    pub fn toxicity(&self) -> f64 {
        self.vpin.as_ref().map(VPINEngine::value).unwrap_or(0.0)
    }

    pub fn toxicity_level(&self) -> Option<ToxicityLevel> {
        self.vpin.as_ref().map(VPINEngine::toxicity_level)
    }

    pub fn ofi(&self) -> f64 {
        self.hawkes.as_ref().map(HawkesOFI::ofi).unwrap_or(0.0)
    }

    pub fn is_valid(&self) -> bool {
        let vpin_ok = self.vpin.as_ref().map(VPINEngine::is_valid);
        let hawkes_ok = self.hawkes.as_ref().map(HawkesOFI::is_fitted);
        match (vpin_ok, hawkes_ok) {
            (Some(v), Some(h)) => v && h,
            (Some(v), None) => v,
            (None, Some(h)) => h,
            (None, None) => false,
        }
    }

    pub fn reset(&mut self) {
        if let Some(vpin) = self.vpin.as_mut() {
            vpin.reset();
        }
        if let Some(hawkes) = self.hawkes.as_mut() {
            hawkes.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierMethod;
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
    fn disabling_hawkes_drops_its_conjunct_from_validity() {
        let config = OrderflowBusConfig {
            vpin: Some(VPINConfig::new(10.0, 10, 0.0, ClassifierMethod::CloseVsOpen).unwrap()),
            hawkes: None,
        };
        let mut bus = OrderflowBus::new(config);
        for _ in 0..10 {
            bus.handle_bar(&bar(10.0, 11.0, 9.0, 11.0, 10.0)).unwrap();
        }
        assert!(bus.is_valid());
        assert_eq!(bus.ofi(), 0.0);
    }

    #[test]
    fn reset_clears_both_sides() {
        let config = OrderflowBusConfig {
            vpin: Some(VPINConfig::new(10.0, 10, 0.0, ClassifierMethod::CloseVsOpen).unwrap()),
            hawkes: None,
        };
        let mut bus = OrderflowBus::new(config);
        for _ in 0..10 {
            bus.handle_bar(&bar(10.0, 11.0, 9.0, 11.0, 10.0)).unwrap();
        }
        bus.reset();
        assert!(!bus.is_valid());
        assert_eq!(bus.toxicity(), 0.0);
    }
}
