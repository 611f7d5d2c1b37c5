use ecg_lib::config::{default_config_path, AppConfig};
use ecg_lib::plot::{Figure, Style, XAxis};
use ecg_lib::{ModelStatus, RecordPipeline};
use eframe::{egui, egui::ViewportBuilder};
use egui_plot::{Legend, Line, Plot};
use env_logger::Env;
use log::{info, warn};
use rfd::FileDialog;
use std::path::{Path, PathBuf};

mod store;

use store::Store;

const APP_TITLE: &str = "ECG app";

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::load(None).unwrap_or_else(|err| {
        warn!("falling back to default config: {:#}", err);
        AppConfig::default()
    });
    info!("loading classifier from {}", config.model_path.display());
    let pipeline = RecordPipeline::from_model_path(&config.model_path);
    let initial_file = std::env::args_os().nth(1).map(PathBuf::from);

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(move |_cc| {
            let mut app = EcgApp::new(config, pipeline);
            if let Some(path) = initial_file {
                app.open_file(&path);
            }
            Ok(Box::new(app))
        }),
    )
}

#[derive(Copy, Clone, PartialEq)]
enum Page {
    Home,
    View,
    Settings,
}

impl Page {
    fn title(&self) -> &'static str {
        match self {
            Page::Home => "Add File",
            Page::View => "View",
            Page::Settings => "Settings",
        }
    }

    fn all() -> [Page; 3] {
        [Page::Home, Page::View, Page::Settings]
    }
}

struct EcgApp {
    pipeline: RecordPipeline,
    model_status: ModelStatus,
    config: AppConfig,
    store: Store,
    active_page: Page,
    title_dirty: bool,
}

impl EcgApp {
    fn new(config: AppConfig, pipeline: RecordPipeline) -> Self {
        let model_status = pipeline.model_status();
        Self {
            pipeline,
            model_status,
            store: Store::new(config.sample_rate_hz),
            config,
            active_page: Page::Home,
            title_dirty: true,
        }
    }

    fn set_page(&mut self, page: Page) {
        if self.active_page != page {
            self.active_page = page;
            self.title_dirty = true;
        }
    }

    fn open_dialog(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("ECG CSV", &["csv"])
            .add_filter("All files", &["*"])
            .pick_file()
        {
            self.open_file(&path);
        }
    }

    fn open_file(&mut self, path: &Path) {
        self.store.begin_load(path);
        self.pipeline.open(path, &mut self.store);
        self.set_page(Page::View);
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let open_shortcut = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::O);
        if ctx.input_mut(|i| i.consume_shortcut(&open_shortcut)) {
            self.open_dialog();
        }
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if let Some(path) = dropped.first() {
            self.open_file(path);
        }
    }

    fn show_menu(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open…").clicked() {
                    ui.close_menu();
                    self.open_dialog();
                }
                if ui.button("Quit").clicked() {
                    ui.close_menu();
                    ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn show_home_page(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(48.0);
                ui.heading("ECG heartbeat classifier");
                ui.label("Pick a CSV with 187 samples and a label column.");
                ui.add_space(16.0);
                if ui.button("Add file").clicked() {
                    self.open_dialog();
                }
                ui.add_space(8.0);
                ui.label("You can also drop a file onto this window.");
                if !self.model_status.is_ready() {
                    ui.add_space(16.0);
                    ui.colored_label(
                        egui::Color32::LIGHT_RED,
                        "Classifier unavailable: waveforms can be viewed but not classified.",
                    );
                }
            });
        });
    }

    fn show_view_page(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("record_panel").show(ctx, |ui| {
            ui.heading("Recording");
            if ui.button("Open another file").clicked() {
                self.open_dialog();
            }
            ui.separator();
            if let Some(source) = self.store.source() {
                ui.horizontal(|ui| {
                    ui.label("File: ");
                    ui.monospace(source.display().to_string());
                });
            }
            if let Some(record) = self.store.record() {
                ui.label(format!("Samples: {}", record.len()));
            }
            ui.separator();
            ui.label(self.store.ground_truth_text());
            match self.store.prediction() {
                Some(result) => {
                    let color = match result.label {
                        ecg_lib::Label::Normal => egui::Color32::LIGHT_GREEN,
                        ecg_lib::Label::Abnormal => egui::Color32::LIGHT_RED,
                    };
                    ui.colored_label(color, self.store.prediction_text());
                    ui.label(format!("Raw probability: {:.3}", result.probability));
                }
                None => {
                    ui.label(self.store.prediction_text());
                }
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.store.record().is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label("Load an ECG recording to see the waveform.");
                });
                return;
            }
            if let Some(fig) = self.store.figure() {
                let mut plot = Plot::new("ecg_plot")
                    .height(360.0)
                    .legend(Legend::default());
                if let Some(label) = &fig.x.label {
                    plot = plot.x_axis_label(label.clone());
                }
                if let Some(label) = &fig.y.label {
                    plot = plot.y_axis_label(label.clone());
                }
                plot.show(ui, |plot_ui| plot_figure(plot_ui, fig));
            }
        });
    }

    fn show_settings_page(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Classifier");
            ui.horizontal(|ui| {
                ui.label("Model: ");
                ui.monospace(self.config.model_path.display().to_string());
            });
            match &self.model_status {
                ModelStatus::Ready => {
                    ui.colored_label(egui::Color32::LIGHT_GREEN, "Loaded");
                }
                ModelStatus::Unavailable { reason } => {
                    ui.colored_label(egui::Color32::LIGHT_RED, format!("Unavailable: {reason}"));
                    ui.label("Fix the model file and restart the application.");
                }
            }
            if let Some(path) = default_config_path() {
                ui.horizontal(|ui| {
                    ui.label("Config file: ");
                    ui.monospace(path.display().to_string());
                });
            }

            ui.separator();
            ui.heading("Plot");
            let mut fs = self.store.sample_rate_hz();
            if ui
                .add(egui::Slider::new(&mut fs, 50.0..=1000.0).text("Sample rate (Hz)"))
                .changed()
            {
                self.store.set_sample_rate_hz(fs);
            }
            let mut x_axis = self.store.x_axis();
            ui.horizontal(|ui| {
                ui.label("X axis");
                ui.radio_value(&mut x_axis, XAxis::Samples, "Samples");
                ui.radio_value(&mut x_axis, XAxis::Seconds, "Seconds");
            });
            self.store.set_x_axis(x_axis);
        });
    }
}

impl eframe::App for EcgApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.show_menu(ui);
            ui.horizontal(|ui| {
                for page in Page::all() {
                    let selected = self.active_page == page;
                    if ui.selectable_label(selected, page.title()).clicked() {
                        self.set_page(page);
                    }
                }
            });
        });

        if self.title_dirty {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
                "{} - {}",
                APP_TITLE,
                self.active_page.title()
            )));
            self.title_dirty = false;
        }

        egui::TopBottomPanel::bottom("bottom").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Status: {}", self.store.status()));
            });
        });

        match self.active_page {
            Page::Home => self.show_home_page(ctx),
            Page::View => self.show_view_page(ctx),
            Page::Settings => self.show_settings_page(ctx),
        }
    }
}

fn plot_figure(plot_ui: &mut egui_plot::PlotUi, figure: &Figure) {
    for line in &figure.series {
        plot_ui.line(
            Line::new(line.points.clone())
                .stroke(stroke_from_style(&line.style))
                .name(line.name.clone()),
        );
    }
}

fn stroke_from_style(style: &Style) -> egui::Stroke {
    let (r, g, b) = style.color.rgb();
    egui::Stroke::new(style.width, egui::Color32::from_rgb(r, g, b))
}
