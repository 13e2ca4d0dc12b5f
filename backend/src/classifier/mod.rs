pub mod decode;
pub mod error;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod service;

pub use error::ClassifierError;
pub use model::{InferenceEngine, TorchModel};
pub use service::PlanetAnalytics;
