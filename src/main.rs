//! Main application for the vidgrab downloader GUI

// yt-dlp subprocess boundary and worker task
mod engine;
// Session state machine and worker-to-UI events
mod model;
// Format/quality translation into engine invocations
mod options;
// Progress template and line parsing
mod progress;
// Thumbnail fetching for the preview
mod thumbnail;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::{egui, App, Frame};
use egui::{Color32, ColorImage, TextureOptions, Visuals};
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing_subscriber::EnvFilter;

use model::{SessionState, StatusTone, WorkerEvent};
use options::{DownloadRequest, FormatKind, QualityOption};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: initializes logging and the runtime, launches the GUI
fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rt = Arc::new(Runtime::new().unwrap());
    RUNTIME.set(rt).unwrap();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([480.0, 460.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Video Downloader",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(DownloaderApp::default())
        }),
    )
}

/// Application state for the GUI
struct DownloaderApp {
    /// Input field for the video URL
    url_input: String,
    /// Selected output format
    format: FormatKind,
    /// Selected quality from the format's table
    quality: QualityOption,
    /// Lifecycle state fed by drained worker events
    session: SessionState,
    /// Event channel of the in-flight download, if any
    events_rx: Option<UnboundedReceiver<WorkerEvent>>,
    /// Hand-off slot for a fetched thumbnail image
    thumbnail_result: Arc<Mutex<Option<ColorImage>>>,
    /// Texture of the current thumbnail preview
    thumbnail_tex: Option<egui::TextureHandle>,
}

impl Default for DownloaderApp {
    fn default() -> Self {
        let format = FormatKind::Audio;
        Self {
            url_input: String::new(),
            format,
            quality: format.default_quality(),
            session: SessionState::default(),
            events_rx: None,
            thumbnail_result: Arc::new(Mutex::new(None)),
            thumbnail_tex: None,
        }
    }
}

impl DownloaderApp {
    /// Validates the form and dispatches one download to the worker.
    fn start_download(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            // Rejected before any engine call; UI state stays untouched.
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("Error")
                .set_description("Please enter a valid URL")
                .show();
            return;
        }

        self.session.begin();
        self.thumbnail_tex = None;
        *self.thumbnail_result.lock().unwrap() = None;

        let (tx, rx) = unbounded_channel();
        self.events_rx = Some(rx);

        let request = DownloadRequest {
            url,
            format: self.format,
            quality: self.quality,
        };
        RUNTIME.get().unwrap().spawn(engine::run_job(request, tx));
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Drain worker events into the session state
        if let Some(rx) = &mut self.events_rx {
            while let Ok(event) = rx.try_recv() {
                match event {
                    WorkerEvent::ThumbnailUrl(url) => {
                        // Fetch off-thread; the decoded image lands in the slot
                        let slot = Arc::clone(&self.thumbnail_result);
                        let ctx_c = ctx.clone();
                        RUNTIME.get().unwrap().spawn_blocking(move || {
                            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                                *slot.lock().unwrap() = Some(img);
                                ctx_c.request_repaint();
                            }
                        });
                    }
                    event => {
                        if matches!(event, WorkerEvent::Completed { .. }) {
                            self.url_input.clear();
                        }
                        self.session.apply(event);
                    }
                }
            }
        }

        // Handle a completed thumbnail fetch
        if let Some(img) = self.thumbnail_result.lock().unwrap().take() {
            self.thumbnail_tex =
                Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Video Downloader");

            ui.label("Video URL:");
            ui.text_edit_singleline(&mut self.url_input);

            ui.label("Select Format:");
            let previous = self.format;
            egui::ComboBox::from_id_source("format")
                .selected_text(self.format.label())
                .show_ui(ui, |ui| {
                    for kind in FormatKind::ALL {
                        ui.selectable_value(&mut self.format, kind, kind.label());
                    }
                });
            // Switching format swaps the quality table, so reset the selection
            if self.format != previous {
                self.quality = self.format.default_quality();
            }

            ui.label(self.format.quality_caption());
            egui::ComboBox::from_id_source("quality")
                .selected_text(self.quality.label)
                .show_ui(ui, |ui| {
                    for option in self.format.quality_options() {
                        ui.selectable_value(&mut self.quality, *option, option.label);
                    }
                });

            ui.add_space(8.0);
            if ui
                .add_enabled(!self.session.is_running(), egui::Button::new("Download"))
                .clicked()
            {
                self.start_download();
            }

            if let Some(tex) = &self.thumbnail_tex {
                ui.add(egui::Image::new(tex).max_width(320.0));
            }

            ui.add(egui::ProgressBar::new(self.session.progress as f32 / 100.0).show_percentage());

            if !self.session.status_text.is_empty() {
                ui.colored_label(tone_color(self.session.status_tone), &self.session.status_text);
            }

            if ui
                .add_enabled(
                    self.session.reveal_enabled,
                    egui::Button::new("Show in Folder"),
                )
                .clicked()
            {
                if let Some(folder) = self.session.last_output_dir.clone() {
                    reveal_folder(folder);
                }
            }
        });

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

fn tone_color(tone: StatusTone) -> Color32 {
    match tone {
        StatusTone::Info => Color32::LIGHT_BLUE,
        StatusTone::Busy => Color32::from_rgb(255, 165, 0),
        StatusTone::Good => Color32::LIGHT_GREEN,
        StatusTone::Bad => Color32::LIGHT_RED,
    }
}

/// Opens the platform file manager at the given folder.
fn reveal_folder(folder: PathBuf) {
    std::thread::spawn(move || {
        let folder = std::path::absolute(&folder).unwrap_or(folder);
        #[cfg(target_os = "windows")]
        {
            let _ = std::process::Command::new("explorer").arg(&folder).spawn();
        }
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open").arg(&folder).spawn();
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let _ = std::process::Command::new("xdg-open").arg(&folder).spawn();
        }
    });
}
