use serde::{Deserialize, Serialize};
use std::fmt;

/// Samples per heartbeat recording.
pub const SAMPLE_COUNT: usize = 187;
/// Samples plus the trailing label column.
pub const COLUMN_COUNT: usize = SAMPLE_COUNT + 1;
/// Sampling rate of the heartbeat datasets the classifier is trained on.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 125.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Abnormal,
}

impl Label {
    /// Maps a raw class id to a binary label. Any non-zero class is an arrhythmia.
    pub fn from_value(value: f64) -> Self {
        if value == 0.0 {
            Label::Normal
        } else {
            Label::Abnormal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::Abnormal => "Abnormal",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One heartbeat: the waveform and its ground-truth annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgRecord {
    /// Exactly [`SAMPLE_COUNT`] samples.
    pub samples: Vec<f64>,
    pub label: Label,
    /// Label column as it appeared in the file.
    pub raw_label: f64,
}

impl EcgRecord {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self, fs: f64) -> f64 {
        self.samples.len() as f64 / fs
    }

    pub fn summary(&self) -> RecordSummary {
        let min = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self
            .samples
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let mean = if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        };
        RecordSummary {
            samples: self.samples.len(),
            label: self.label,
            raw_label: self.raw_label,
            min,
            max,
            mean,
        }
    }
}

/// Amplitude overview printed by `ecg inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub samples: usize,
    pub label: Label,
    pub raw_label: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_only_normal_class() {
        assert_eq!(Label::from_value(0.0), Label::Normal);
        assert_eq!(Label::from_value(1.0), Label::Abnormal);
        assert_eq!(Label::from_value(3.0), Label::Abnormal);
    }

    #[test]
    fn summary_tracks_amplitude_range() {
        let record = EcgRecord {
            samples: vec![0.0, 0.5, 1.0, 0.5],
            label: Label::Normal,
            raw_label: 0.0,
        };
        let summary = record.summary();
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 1.0);
        assert!((summary.mean - 0.5).abs() < 1e-12);
        assert!((record.duration(2.0) - 2.0).abs() < 1e-12);
    }
}
