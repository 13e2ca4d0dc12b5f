use shared::ClassProbabilities;

use super::error::ClassifierError;
use crate::config::Thresholds;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn round4(p: f32) -> f64 {
    (p as f64 * 10_000.0).round() / 10_000.0
}

fn check_scores(raw: &[f32], classes: &[String]) -> Result<(), ClassifierError> {
    if raw.len() != classes.len() {
        return Err(ClassifierError::Inference(format!(
            "model returned {} scores for {} classes",
            raw.len(),
            classes.len()
        )));
    }
    if let Some(i) = raw.iter().position(|s| s.is_nan()) {
        return Err(ClassifierError::Inference(format!(
            "model returned NaN for class '{}'",
            classes[i]
        )));
    }
    Ok(())
}

/// Labels whose sigmoid score is strictly above their threshold, in class order.
pub fn select_labels(
    raw: &[f32],
    classes: &[String],
    thresholds: &Thresholds,
) -> Result<Vec<String>, ClassifierError> {
    check_scores(raw, classes)?;
    let mut selected = Vec::new();
    for (i, (score, class)) in raw.iter().zip(classes).enumerate() {
        let threshold = thresholds.for_class(i).ok_or_else(|| {
            ClassifierError::Inference(format!("no threshold configured for class '{}'", class))
        })?;
        if sigmoid(*score) > threshold {
            selected.push(class.clone());
        }
    }
    Ok(selected)
}

/// Sigmoid probability per class, rounded to 4 decimals, in class order.
pub fn probabilities(raw: &[f32], classes: &[String]) -> Result<ClassProbabilities, ClassifierError> {
    check_scores(raw, classes)?;
    let mut out = ClassProbabilities::with_capacity(classes.len());
    for (score, class) in raw.iter().zip(classes) {
        out.push(class.as_str(), round4(sigmoid(*score)));
    }
    Ok(out)
}
