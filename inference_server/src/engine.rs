use ndarray::{Array2, ArrayView2};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;

use crate::config::ModelConfig;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("ONNX runtime error: {0}")]
    Runtime(String),

    #[error("model produced no {0} output")]
    MissingOutput(String),

    #[error("feature matrix has {found} columns, model expects {expected}")]
    FeatureCount { expected: usize, found: usize },

    #[error("malformed model output: {0}")]
    Malformed(String),
}

fn runtime(err: impl std::fmt::Display) -> ModelError {
    ModelError::Runtime(err.to_string())
}

/// Class labels and per-class probabilities, one entry per input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    pub labels: Vec<i64>,
    pub probabilities: Vec<Vec<f64>>,
}

/// A pre-trained classifier. Columns of the input must follow the order the
/// model was trained on; the classifier cannot check this itself.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, ModelError>;
}

/// Classifier exported to ONNX with a label tensor and a probability tensor
/// (scikit-learn models converted with `zipmap` disabled).
pub struct OnnxClassifier {
    // Session::run needs exclusive access
    session: Mutex<Session>,
    label_output: String,
    probability_output: String,
}

impl OnnxClassifier {
    pub fn load(path: &Path, config: &ModelConfig) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?
            .with_intra_threads(config.intra_threads)
            .map_err(runtime)?
            .commit_from_file(path)
            .map_err(runtime)?;

        Ok(Self {
            session: Mutex::new(session),
            label_output: config.label_output.clone(),
            probability_output: config.probability_output.clone(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ClassifierOutput, ModelError> {
        let rows = features.nrows();
        let input: Array2<f32> = features.mapv(|v| v as f32);
        let tensor = Tensor::from_array(input).map_err(runtime)?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![tensor]).map_err(runtime)?;

        let labels = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| ModelError::MissingOutput(self.label_output.clone()))?
            .try_extract_tensor::<i64>()
            .map_err(runtime)?
            .1
            .to_vec();

        let (_, probs) = outputs
            .get(self.probability_output.as_str())
            .ok_or_else(|| ModelError::MissingOutput(self.probability_output.clone()))?
            .try_extract_tensor::<f32>()
            .map_err(runtime)?;

        if rows == 0 || probs.is_empty() || probs.len() % rows != 0 {
            return Err(ModelError::Malformed(format!(
                "{} probabilities for {} rows",
                probs.len(),
                rows
            )));
        }
        let classes = probs.len() / rows;
        let probabilities = probs
            .chunks(classes)
            .map(|row| row.iter().map(|&p| p as f64).collect())
            .collect();

        Ok(ClassifierOutput {
            labels,
            probabilities,
        })
    }
}
