#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Preprocess error: {0}")]
    Preprocess(String),
    #[error("Model load error: {0}")]
    ModelLoad(String),
    #[error("Inference error: {0}")]
    Inference(String),
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::Decode(err.to_string())
    }
}

impl From<tch::TchError> for ClassifierError {
    fn from(err: tch::TchError) -> Self {
        ClassifierError::Inference(err.to_string())
    }
}
