use log::debug;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::record::{EcgRecord, Label, SAMPLE_COUNT};

/// Probability at or above which a beat is called abnormal.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// A pre-trained binary heartbeat classifier.
///
/// Implementations receive a `(1, 187, 1)` tensor and return the probability
/// that the beat is abnormal. They must not mutate observable state between
/// calls so that repeated predictions on the same input agree.
pub trait Model {
    fn predict(&self, input: Array3<f32>) -> PipelineResult<f32>;
}

/// Process-lifetime model slot. `Unavailable` keeps the reason the load failed.
pub enum ModelHandle {
    Ready(Box<dyn Model>),
    Unavailable { reason: String },
}

impl ModelHandle {
    pub fn ready(model: impl Model + 'static) -> Self {
        ModelHandle::Ready(Box::new(model))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelHandle::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> ModelStatus {
        match self {
            ModelHandle::Ready(_) => ModelStatus::Ready,
            ModelHandle::Unavailable { reason } => ModelStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    Ready,
    Unavailable { reason: String },
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Probability mass assigned to `label`, in [0, 1].
    pub confidence: f32,
    /// Raw model output: probability of `Abnormal`.
    pub probability: f32,
}

impl ClassificationResult {
    pub fn from_probability(p: f32) -> PipelineResult<Self> {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PipelineError::Inference(format!(
                "model returned invalid probability {}",
                p
            )));
        }
        let (label, confidence) = if p >= DECISION_THRESHOLD {
            (Label::Abnormal, p)
        } else {
            (Label::Normal, 1.0 - p)
        };
        Ok(Self {
            label,
            confidence,
            probability: p,
        })
    }

    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// Lay the waveform out as `(batch=1, 187, channels=1)` in `f32`.
pub fn waveform_tensor(record: &EcgRecord) -> PipelineResult<Array3<f32>> {
    let data: Vec<f32> = record.samples.iter().map(|&v| v as f32).collect();
    Array3::from_shape_vec((1, SAMPLE_COUNT, 1), data).map_err(|e| {
        PipelineError::Inference(format!("failed to shape waveform tensor: {}", e))
    })
}

/// Run `handle` on `record` and turn its scalar output into a prediction.
pub fn classify(record: &EcgRecord, handle: &ModelHandle) -> PipelineResult<ClassificationResult> {
    let model = match handle {
        ModelHandle::Ready(model) => model,
        ModelHandle::Unavailable { .. } => return Err(PipelineError::model_unavailable()),
    };
    let input = waveform_tensor(record)?;
    let p = model.predict(input)?;
    debug!("model probability {:.4}", p);
    ClassificationResult::from_probability(p)
}
