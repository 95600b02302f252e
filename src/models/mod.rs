//! Trained artifacts and model inference components

pub mod bundle;
pub mod encoder;
pub mod inference;
pub mod loader;
pub mod scaler;

pub use bundle::ArtifactBundle;
pub use encoder::EncoderTable;
pub use inference::{RiskClassifier, RiskModel};
pub use loader::ArtifactLoader;
pub use scaler::ScalerParameters;
