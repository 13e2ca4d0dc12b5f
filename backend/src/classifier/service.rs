use ndarray::ArrayView3;
use shared::ClassProbabilities;
use std::sync::Arc;

use super::decode::decode_image;
use super::error::ClassifierError;
use super::model::InferenceEngine;
use super::postprocess::{probabilities, select_labels};
use super::preprocess::preprocess;
use crate::config::{ClassifierConfig, InputSize};

/// Runs preprocess -> forward -> postprocess for the planet classifier.
///
/// Cloning is cheap; every clone shares the same config and engine.
#[derive(Clone)]
pub struct PlanetAnalytics {
    config: Arc<ClassifierConfig>,
    engine: Arc<dyn InferenceEngine>,
}

impl PlanetAnalytics {
    pub fn new(config: ClassifierConfig, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.config.classes
    }

    pub fn input_size(&self) -> InputSize {
        self.config.input_size
    }

    fn raw_scores(&self, image: ArrayView3<u8>) -> Result<Vec<f32>, ClassifierError> {
        let batch = preprocess(image, self.config.input_size)?;
        let scores = self.engine.forward(&batch)?;
        log::debug!("Raw model scores: {:?}", scores);
        Ok(scores)
    }

    pub fn classify(&self, image: ArrayView3<u8>) -> Result<Vec<String>, ClassifierError> {
        let scores = self.raw_scores(image)?;
        select_labels(&scores, &self.config.classes, &self.config.thresholds)
    }

    pub fn classify_with_probabilities(
        &self,
        image: ArrayView3<u8>,
    ) -> Result<ClassProbabilities, ClassifierError> {
        let scores = self.raw_scores(image)?;
        probabilities(&scores, &self.config.classes)
    }

    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Vec<String>, ClassifierError> {
        let image = decode_image(bytes)?;
        self.classify(image.view())
    }

    pub fn classify_bytes_with_probabilities(
        &self,
        bytes: &[u8],
    ) -> Result<ClassProbabilities, ClassifierError> {
        let image = decode_image(bytes)?;
        self.classify_with_probabilities(image.view())
    }
}
