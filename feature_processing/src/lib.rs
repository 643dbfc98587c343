pub mod error;
pub mod indicators;
pub mod loader;
pub mod misc;
pub mod processor;

pub use error::FeatureError;
pub use misc::{FEATURE_NAMES, OhlcvRecord};
pub use processor::{FeaturePreparer, PreparedFeatures, SUPPORTED_HORIZONS};
