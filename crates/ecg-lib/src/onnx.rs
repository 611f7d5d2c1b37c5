//! ONNX Runtime backend for [`Model`].

use log::info;
use ndarray::Array3;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

use crate::classifier::Model;
use crate::error::{PipelineError, PipelineResult};
use crate::record::SAMPLE_COUNT;

/// A heartbeat classifier exported to ONNX, input `(batch, 187, 1)`.
pub struct OnnxModel {
    input_name: String,
    // `Session::run` takes `&mut self`; the lock is never contended.
    session: Mutex<Session>,
}

impl OnnxModel {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.is_file() {
            return Err(PipelineError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let _ = ort::init().with_name("ecg-viewer").commit();

        let session = Session::builder()
            .map_err(|e| load_error("failed to create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error("failed to set optimization level", e))?
            .with_intra_threads(1)
            .map_err(|e| load_error("failed to set intra threads", e))?
            .commit_from_file(path)
            .map_err(|e| load_error("failed to load ONNX model", e))?;

        let input = session.inputs().first().ok_or_else(|| {
            PipelineError::ModelLoad("model declares no inputs".into())
        })?;
        let dims: Vec<i64> = input
            .dtype()
            .tensor_shape()
            .map(|shape| shape.iter().copied().collect())
            .ok_or_else(|| PipelineError::ModelLoad("model input is not a tensor".into()))?;
        check_input_shape(&dims)?;
        let input_name = input.name().to_string();

        info!(
            "loaded ONNX model {} (input '{}' {:?})",
            path.display(),
            input_name,
            dims
        );
        Ok(Self {
            input_name,
            session: Mutex::new(session),
        })
    }
}

impl Model for OnnxModel {
    fn predict(&self, input: Array3<f32>) -> PipelineResult<f32> {
        let tensor = Value::from_array(input)
            .map_err(|e| PipelineError::Inference(format!("failed to create tensor value: {}", e)))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| PipelineError::Inference("model session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| PipelineError::Inference(format!("inference failed: {}", e)))?;
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| PipelineError::Inference("model produced no outputs".into()))?;
        let (_, data) = output.try_extract_tensor::<f32>().map_err(|e| {
            PipelineError::Inference(format!("failed to extract output tensor: {}", e))
        })?;
        let p = data.first().copied();
        p.ok_or_else(|| PipelineError::Inference("model output is empty".into()))
    }
}

/// Accepts `(batch, 187, 1)` where batch may be dynamic (negative) or 1.
pub fn check_input_shape(dims: &[i64]) -> PipelineResult<()> {
    let batch_ok = |d: i64| d < 0 || d == 1;
    match dims {
        [batch, samples, channels]
            if batch_ok(*batch) && *samples == SAMPLE_COUNT as i64 && *channels == 1 =>
        {
            Ok(())
        }
        _ => Err(PipelineError::ModelLoad(format!(
            "unexpected model input shape {:?}, expected (batch, {}, 1)",
            dims, SAMPLE_COUNT
        ))),
    }
}

fn load_error(context: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::ModelLoad(format!("{}: {}", context, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dynamic_and_unit_batch() {
        assert!(check_input_shape(&[-1, 187, 1]).is_ok());
        assert!(check_input_shape(&[1, 187, 1]).is_ok());
    }

    #[test]
    fn rejects_mismatched_shapes() {
        for dims in [
            vec![-1, 186, 1],
            vec![-1, 187],
            vec![-1, 187, 2],
            vec![4, 187, 1],
            vec![-1, 1, 187],
        ] {
            let err = check_input_shape(&dims).unwrap_err();
            assert!(matches!(err, PipelineError::ModelLoad(_)), "{:?}", dims);
        }
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../test_data")
            .join(name)
    }

    fn constant_input(value: f32) -> Array3<f32> {
        Array3::from_elem((1, SAMPLE_COUNT, 1), value)
    }

    #[test]
    fn fixture_model_averages_then_squashes() {
        let model = OnnxModel::load(&fixture("mean_sigmoid.onnx")).expect("fixture loads");
        let low = model.predict(constant_input(-2.0)).unwrap();
        let high = model.predict(constant_input(1.5)).unwrap();
        assert!((low - 0.119_203).abs() < 1e-4, "{low}");
        assert!((high - 0.817_574).abs() < 1e-4, "{high}");
    }

    #[test]
    fn fixture_model_classifies_through_the_handle() {
        let handle = crate::pipeline::load_model(&fixture("mean_sigmoid.onnx")).unwrap();
        assert!(handle.status().is_ready());
        let record = crate::record::EcgRecord {
            samples: vec![-2.0; SAMPLE_COUNT],
            label: crate::record::Label::Normal,
            raw_label: 0.0,
        };
        let result = crate::classifier::classify(&record, &handle).unwrap();
        assert_eq!(result.label, crate::record::Label::Normal);
        assert!((result.confidence - 0.880_797).abs() < 1e-4);
    }

    #[test]
    fn wrong_input_length_is_a_load_error() {
        let err = OnnxModel::load(&fixture("mean_sigmoid_100.onnx"))
            .err()
            .expect("shape check should fail");
        match err {
            PipelineError::ModelLoad(msg) => assert!(msg.contains("unexpected model input shape")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn corrupt_file_is_a_load_error() {
        let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"this is not a protobuf\x00\xff\x13").unwrap();
        let err = OnnxModel::load(file.path()).err().expect("load should fail");
        assert!(matches!(err, PipelineError::ModelLoad(_)), "{err:?}");
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = OnnxModel::load(Path::new("/nope/ecg_classifier.onnx"))
            .err()
            .expect("load should fail");
        match err {
            PipelineError::ModelLoad(msg) => assert!(msg.contains("not found")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
