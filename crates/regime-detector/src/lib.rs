pub mod detector;
pub mod error;
pub mod gmm;
pub mod hmm;
pub mod types;

pub use detector::{RegimeDetector, RegimeDetectorConfig};
pub use error::RegimeError;
pub use gmm::{VolLabel, VolatilityGmm};
pub use hmm::{Decoded, HiddenMarkovModel};
pub use types::{RegimeClassification, RegimeLabel};
