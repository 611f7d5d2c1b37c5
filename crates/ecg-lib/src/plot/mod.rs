use serde::{Deserialize, Serialize};

use crate::record::EcgRecord;

pub const WAVEFORM_COLOR: u32 = 0x1F77B4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<LineSeries>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: LineSeries) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series; `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points.iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

/// Units for the waveform's horizontal axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XAxis {
    Samples,
    Seconds,
}

pub fn figure_from_record(title: &str, record: &EcgRecord, x_axis: XAxis, fs: f64) -> Figure {
    let dt = match x_axis {
        XAxis::Samples => 1.0,
        XAxis::Seconds => 1.0 / fs.max(1.0),
    };
    let points: Vec<[f64; 2]> = record
        .samples
        .iter()
        .enumerate()
        .map(|(i, value)| [i as f64 * dt, *value])
        .collect();
    let mut fig = Figure::new(Some(title.to_string()));
    fig.x.label = Some(
        match x_axis {
            XAxis::Samples => "Sample",
            XAxis::Seconds => "Time (s)",
        }
        .into(),
    );
    fig.y.label = Some("Amplitude".into());
    fig.add_series(LineSeries {
        name: format!("ECG ({})", record.label),
        points,
        style: Style {
            width: 1.4,
            color: Color(WAVEFORM_COLOR),
        },
    });
    fig
}
