use ecg_lib::{
    plot::{figure_from_record, Figure, XAxis},
    ClassificationResult, EcgRecord, RecordView,
};
use std::path::{Path, PathBuf};

/// Everything the View page shows for the current file selection.
pub struct Store {
    record: Option<EcgRecord>,
    source: Option<PathBuf>,
    prediction: Option<ClassificationResult>,
    status: String,
    figure: Option<Figure>,
    figure_dirty: bool,
    x_axis: XAxis,
    sample_rate_hz: f64,
}

impl Store {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            record: None,
            source: None,
            prediction: None,
            status: "No recording loaded".into(),
            figure: None,
            figure_dirty: false,
            x_axis: XAxis::Samples,
            sample_rate_hz,
        }
    }

    /// Drop the previous recording before a new selection is processed.
    pub fn begin_load(&mut self, path: &Path) {
        self.record = None;
        self.prediction = None;
        self.figure = None;
        self.figure_dirty = false;
        self.source = Some(path.to_path_buf());
        self.status = format!("Loading {}", path.display());
    }

    pub fn record(&self) -> Option<&EcgRecord> {
        self.record.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn prediction(&self) -> Option<&ClassificationResult> {
        self.prediction.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn x_axis(&self) -> XAxis {
        self.x_axis
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn set_x_axis(&mut self, x_axis: XAxis) {
        if self.x_axis != x_axis {
            self.x_axis = x_axis;
            self.figure_dirty |= self.record.is_some();
        }
    }

    pub fn set_sample_rate_hz(&mut self, fs: f64) {
        let fs = fs.max(1.0);
        if (self.sample_rate_hz - fs).abs() > f64::EPSILON {
            self.sample_rate_hz = fs;
            self.figure_dirty |= self.record.is_some() && self.x_axis == XAxis::Seconds;
        }
    }

    /// Rebuilds the waveform figure when the record or axis settings changed.
    pub fn figure(&mut self) -> Option<&Figure> {
        if self.figure_dirty {
            self.figure = self.record.as_ref().map(|record| {
                let title = self
                    .source
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "ECG".into());
                figure_from_record(&title, record, self.x_axis, self.sample_rate_hz)
            });
            self.figure_dirty = false;
        }
        self.figure.as_ref()
    }

    pub fn ground_truth_text(&self) -> String {
        match &self.record {
            Some(record) => format!("Ground truth: {}", record.label),
            None => "Ground truth: n/a".into(),
        }
    }

    pub fn prediction_text(&self) -> String {
        match &self.prediction {
            Some(result) => format!(
                "Prediction: {} ({:.1}% confidence)",
                result.label,
                result.confidence_percent()
            ),
            None => "Prediction: n/a".into(),
        }
    }
}

impl RecordView for Store {
    fn show_record(&mut self, path: &Path, record: &EcgRecord) {
        self.record = Some(record.clone());
        self.source = Some(path.to_path_buf());
        self.prediction = None;
        self.figure_dirty = true;
        self.status = format!("Loaded {} ({} samples)", path.display(), record.len());
    }

    fn show_classification(&mut self, result: &ClassificationResult) {
        self.prediction = Some(*result);
        self.status = format!(
            "Predicted {} with {:.1}% confidence",
            result.label,
            result.confidence_percent()
        );
    }

    fn show_error(&mut self, message: &str) {
        self.status = message.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecg_lib::ndarray::Array3;
    use ecg_lib::{Label, Model, ModelHandle, PipelineResult, RecordPipeline};
    use std::io::Write;

    struct Fixed(f32);

    impl Model for Fixed {
        fn predict(&self, _input: Array3<f32>) -> PipelineResult<f32> {
            Ok(self.0)
        }
    }

    fn write_record(columns: usize) -> tempfile::NamedTempFile {
        let fields: Vec<String> = (0..columns)
            .map(|i| if i + 1 == columns { "0".into() } else { "0.25".into() })
            .collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", fields.join(",")).unwrap();
        file
    }

    #[test]
    fn successful_open_fills_every_field() {
        let file = write_record(188);
        let pipeline = RecordPipeline::new(ModelHandle::ready(Fixed(0.10)));
        let mut store = Store::new(125.0);
        store.begin_load(file.path());
        pipeline.open(file.path(), &mut store);

        assert_eq!(store.record().map(|r| r.len()), Some(187));
        assert_eq!(store.ground_truth_text(), "Ground truth: Normal");
        assert_eq!(
            store.prediction_text(),
            "Prediction: Normal (90.0% confidence)"
        );
        assert_eq!(store.prediction().map(|p| p.label), Some(Label::Normal));
        assert_eq!(store.figure().map(|f| f.series[0].points.len()), Some(187));
    }

    #[test]
    fn bad_file_clears_previous_record() {
        let good = write_record(188);
        let bad = write_record(150);
        let pipeline = RecordPipeline::new(ModelHandle::ready(Fixed(0.82)));
        let mut store = Store::new(125.0);
        store.begin_load(good.path());
        pipeline.open(good.path(), &mut store);
        assert!(store.prediction().is_some());

        store.begin_load(bad.path());
        pipeline.open(bad.path(), &mut store);
        assert!(store.record().is_none());
        assert!(store.prediction().is_none());
        assert!(store.figure().is_none());
        assert!(store.status().starts_with("Error: format error: wrong column count"));
    }

    #[test]
    fn missing_model_keeps_waveform_and_reports_error() {
        let file = write_record(188);
        let pipeline = RecordPipeline::new(ModelHandle::unavailable("no model"));
        let mut store = Store::new(125.0);
        store.begin_load(file.path());
        pipeline.open(file.path(), &mut store);
        assert!(store.record().is_some());
        assert!(store.figure().is_some());
        assert_eq!(store.prediction_text(), "Prediction: n/a");
        assert_eq!(store.status(), "Error: inference error: model unavailable");
    }

    #[test]
    fn settings_change_before_first_draw_keeps_figure() {
        let file = write_record(188);
        let record = ecg_lib::io::csv::read_record_csv(file.path()).unwrap();
        let mut store = Store::new(125.0);
        store.show_record(Path::new("a.csv"), &record);
        store.set_sample_rate_hz(250.0);
        store.set_x_axis(XAxis::Samples);
        assert!(store.record().is_some());
        assert_eq!(store.figure().map(|f| f.series[0].points.len()), Some(187));
    }

    #[test]
    fn axis_change_rebuilds_figure() {
        let file = write_record(188);
        let pipeline = RecordPipeline::new(ModelHandle::ready(Fixed(0.6)));
        let mut store = Store::new(125.0);
        pipeline.open(file.path(), &mut store);
        let last_x = |store: &mut Store| store.figure().unwrap().series[0].points[186][0];
        assert_eq!(last_x(&mut store), 186.0);
        store.set_x_axis(XAxis::Seconds);
        assert!((last_x(&mut store) - 186.0 / 125.0).abs() < 1e-12);
        store.set_sample_rate_hz(250.0);
        assert!((last_x(&mut store) - 186.0 / 250.0).abs() < 1e-12);
    }
}
