use log::{info, warn};
use std::path::Path;

use crate::classifier::{self, ClassificationResult, ModelHandle, ModelStatus};
use crate::error::PipelineResult;
use crate::io::csv::read_record_csv;
use crate::record::EcgRecord;

/// Display callbacks a shell implements to receive pipeline output.
pub trait RecordView {
    fn show_record(&mut self, path: &Path, record: &EcgRecord);
    fn show_classification(&mut self, result: &ClassificationResult);
    fn show_error(&mut self, message: &str);
}

/// File load → validation → prediction, with the model as an explicit dependency.
pub struct RecordPipeline {
    model: ModelHandle,
}

impl RecordPipeline {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    /// Load the ONNX model at `path`. A failed load leaves the pipeline usable
    /// for display, with every classification failing.
    #[cfg(feature = "onnx")]
    pub fn from_model_path(path: &Path) -> Self {
        match load_model(path) {
            Ok(handle) => Self::new(handle),
            Err(err) => {
                warn!("classification disabled: {}", err);
                Self::new(ModelHandle::unavailable(err.to_string()))
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    pub fn from_model_path(path: &Path) -> Self {
        warn!(
            "classification disabled: built without ONNX support, ignoring {}",
            path.display()
        );
        Self::new(ModelHandle::unavailable("built without ONNX support"))
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model.status()
    }

    pub fn load(&self, path: &Path) -> PipelineResult<EcgRecord> {
        let record = read_record_csv(path)?;
        info!(
            "loaded {} samples from {} (label {})",
            record.len(),
            path.display(),
            record.label
        );
        Ok(record)
    }

    pub fn classify(&self, record: &EcgRecord) -> PipelineResult<ClassificationResult> {
        classifier::classify(record, &self.model)
    }

    /// Run a full cycle for one file selection and report each step to `view`.
    /// Returns the loaded record so callers can keep it for redraws.
    pub fn open(&self, path: &Path, view: &mut dyn RecordView) -> Option<EcgRecord> {
        let record = match self.load(path) {
            Ok(record) => record,
            Err(err) => {
                warn!("{}: {}", path.display(), err);
                view.show_error(&err.status_message());
                return None;
            }
        };
        view.show_record(path, &record);
        match self.classify(&record) {
            Ok(result) => {
                info!(
                    "{}: predicted {} ({:.1}%)",
                    path.display(),
                    result.label,
                    result.confidence_percent()
                );
                view.show_classification(&result);
            }
            Err(err) => {
                warn!("{}: {}", path.display(), err);
                view.show_error(&err.status_message());
            }
        }
        Some(record)
    }
}

#[cfg(feature = "onnx")]
pub fn load_model(path: &Path) -> PipelineResult<ModelHandle> {
    let model = crate::onnx::OnnxModel::load(path)?;
    Ok(ModelHandle::ready(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::FixedModel;
    use crate::classifier::Model;
    use crate::error::PipelineError;
    use crate::record::{Label, SAMPLE_COUNT};
    use std::io::Write;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingView {
        records: Vec<(PathBuf, usize, Label)>,
        results: Vec<ClassificationResult>,
        errors: Vec<String>,
    }

    impl RecordView for RecordingView {
        fn show_record(&mut self, path: &Path, record: &EcgRecord) {
            self.records
                .push((path.to_path_buf(), record.len(), record.label));
        }

        fn show_classification(&mut self, result: &ClassificationResult) {
            self.results.push(*result);
        }

        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    struct SharedModel(Rc<FixedModel>);

    impl Model for SharedModel {
        fn predict(&self, input: ndarray::Array3<f32>) -> PipelineResult<f32> {
            self.0.predict(input)
        }
    }

    fn write_row(samples: usize, label: &str) -> tempfile::NamedTempFile {
        let mut fields: Vec<String> = (0..samples).map(|i| format!("{}", i as f64 / 200.0)).collect();
        fields.push(label.into());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", fields.join(",")).unwrap();
        file
    }

    #[test]
    fn loads_normal_record() {
        let file = write_row(SAMPLE_COUNT, "0");
        let pipeline = RecordPipeline::new(ModelHandle::ready(FixedModel::new(0.1)));
        let record = pipeline.load(file.path()).unwrap();
        assert_eq!(record.samples.len(), SAMPLE_COUNT);
        assert_eq!(record.label, Label::Normal);
    }

    #[test]
    fn open_reports_record_then_prediction() {
        let file = write_row(SAMPLE_COUNT, "1");
        let pipeline = RecordPipeline::new(ModelHandle::ready(FixedModel::new(0.82)));
        let mut view = RecordingView::default();
        let record = pipeline.open(file.path(), &mut view);
        assert!(record.is_some());
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].1, SAMPLE_COUNT);
        assert_eq!(view.records[0].2, Label::Abnormal);
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.results[0].label, Label::Abnormal);
        assert!(view.errors.is_empty());
    }

    #[test]
    fn wrong_column_count_never_reaches_the_model() {
        let file = write_row(149, "0");
        let model = Rc::new(FixedModel::new(0.9));
        let pipeline = RecordPipeline::new(ModelHandle::ready(SharedModel(model.clone())));
        let mut view = RecordingView::default();
        assert!(pipeline.open(file.path(), &mut view).is_none());
        assert!(view.records.is_empty());
        assert_eq!(model.calls.get(), 0);
        assert_eq!(view.errors.len(), 1);
        assert!(view.errors[0].starts_with("Error: format error: wrong column count"));
    }

    #[test]
    fn unavailable_model_still_displays_waveform() {
        let file = write_row(SAMPLE_COUNT, "0");
        let pipeline = RecordPipeline::new(ModelHandle::unavailable("bad shape"));
        let mut view = RecordingView::default();
        let record = pipeline.open(file.path(), &mut view).expect("record shown");
        assert_eq!(view.records.len(), 1);
        assert!(view.results.is_empty());
        assert_eq!(view.errors, vec!["Error: inference error: model unavailable".to_string()]);
        assert_eq!(
            pipeline.classify(&record).unwrap_err(),
            PipelineError::model_unavailable()
        );
    }

    #[test]
    fn classify_twice_agrees() {
        let file = write_row(SAMPLE_COUNT, "0");
        let pipeline = RecordPipeline::new(ModelHandle::ready(FixedModel::new(0.1)));
        let record = pipeline.load(file.path()).unwrap();
        let a = pipeline.classify(&record).unwrap();
        let b = pipeline.classify(&record).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.label, Label::Normal);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn without_onnx_every_model_path_is_unavailable() {
        let pipeline = RecordPipeline::from_model_path(Path::new("models/ecg_classifier.onnx"));
        assert_eq!(
            pipeline.model_status(),
            ModelStatus::Unavailable {
                reason: "built without ONNX support".into()
            }
        );
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn missing_model_degrades_to_unavailable() {
        let pipeline = RecordPipeline::from_model_path(Path::new("/nope/model.onnx"));
        assert!(!pipeline.model_status().is_ready());
        let file = write_row(SAMPLE_COUNT, "0");
        let record = pipeline.load(file.path()).unwrap();
        assert!(pipeline.classify(&record).unwrap_err().is_inference());
    }
}
