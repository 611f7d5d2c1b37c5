use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ecg_lib::{
    config::AppConfig,
    plot::{figure_from_record, Figure, XAxis},
    ClassificationResult, EcgRecord, Label, ModelHandle, ModelStatus, RecordPipeline,
};
use env_logger::Env;
use log::debug;
use plotters::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "ecg",
    version,
    about = "Inspect, plot and classify single-heartbeat ECG recordings"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AxisUnits {
    Samples,
    Seconds,
}

impl From<AxisUnits> for XAxis {
    fn from(units: AxisUnits) -> Self {
        match units {
            AxisUnits::Samples => XAxis::Samples,
            AxisUnits::Seconds => XAxis::Seconds,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a 188-column record and print an amplitude summary
    Inspect {
        #[arg(long)]
        input: PathBuf,
    },
    /// Load a record and predict Normal/Abnormal with the ONNX classifier
    Classify {
        #[arg(long)]
        input: PathBuf,
        /// Model file; overrides the configured model path
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Render the waveform to a PNG via plotters
    Plot {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value = "samples")]
        x_axis: AxisUnits,
    },
    /// Report whether the classifier loads and why not
    ModelInfo {
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ClassifyOutput {
    input: String,
    samples: usize,
    ground_truth: Label,
    raw_label: f64,
    predicted: Label,
    confidence: f32,
    confidence_percent: f32,
    probability: f32,
}

impl ClassifyOutput {
    fn new(input: &Path, record: &EcgRecord, result: &ClassificationResult) -> Self {
        Self {
            input: input.display().to_string(),
            samples: record.len(),
            ground_truth: record.label,
            raw_label: record.raw_label,
            predicted: result.label,
            confidence: result.confidence,
            confidence_percent: result.confidence_percent(),
            probability: result.probability,
        }
    }
}

#[derive(Serialize)]
struct ModelInfoOutput {
    model_path: String,
    status: ModelStatus,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let config = AppConfig::load(cli.config.as_deref())?;
    debug!("model path {}", config.model_path.display());

    match cli.command {
        Commands::Inspect { input } => cmd_inspect(&input)?,
        Commands::Classify { input, model } => {
            let model_path = model.unwrap_or_else(|| config.model_path.clone());
            cmd_classify(&input, &model_path)?
        }
        Commands::Plot { input, out, x_axis } => {
            cmd_plot(&input, &out, x_axis.into(), config.sample_rate_hz)?
        }
        Commands::ModelInfo { model } => {
            let model_path = model.unwrap_or_else(|| config.model_path.clone());
            cmd_model_info(&model_path)?
        }
    }
    Ok(())
}

/// Loading and plotting never touch the model.
fn display_only_pipeline() -> RecordPipeline {
    RecordPipeline::new(ModelHandle::unavailable("not loaded"))
}

fn cmd_inspect(input: &Path) -> Result<()> {
    let record = display_only_pipeline().load(input)?;
    println!("{}", serde_json::to_string(&record.summary())?);
    Ok(())
}

fn cmd_classify(input: &Path, model_path: &Path) -> Result<()> {
    let pipeline = RecordPipeline::from_model_path(model_path);
    let record = pipeline.load(input)?;
    let result = pipeline.classify(&record)?;
    let out = ClassifyOutput::new(input, &record, &result);
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_model_info(model_path: &Path) -> Result<()> {
    let pipeline = RecordPipeline::from_model_path(model_path);
    let out = ModelInfoOutput {
        model_path: model_path.display().to_string(),
        status: pipeline.model_status(),
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_plot(input: &Path, out: &Path, x_axis: XAxis, fs: f64) -> Result<()> {
    let record = display_only_pipeline().load(input)?;
    let title = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "ECG".into());
    let fig = figure_from_record(&title, &record, x_axis, fs);
    draw_plotters_figure(out, &fig)
        .with_context(|| format!("rendering {}", out.display()))?;
    Ok(())
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let (x_min, x_max, mut y_min, mut y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 0.5;
        y_max += 0.5;
    }
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "ECG".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for line in &fig.series {
        let (r, g, b) = line.style.color.rgb();
        chart.draw_series(LineSeries::new(
            line.points.iter().map(|p| (p[0], p[1])),
            &RGBColor(r, g, b),
        ))?;
    }
    root.present()?;
    Ok(())
}
