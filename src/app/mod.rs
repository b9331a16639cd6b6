use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Context as _;
use eframe::egui::{self, Context};

use nix_drv_graph::config::ViewerConfig;
use nix_drv_graph::graph::{GraphPayload, PayloadFormat, load_payload};
use nix_drv_graph::interaction::{InteractionController, SearchHit};

mod controls;
mod render_utils;
mod view;

type LoadResult = Result<GraphPayload, String>;

pub struct GraphViewerApp {
    config: ViewerConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    controller: InteractionController,
    version: u64,
    search: String,
    search_hits: Vec<SearchHit>,
    hovered: Option<String>,
    /// Last reload failure; the previous graph stays on screen.
    reload_error: Option<String>,
    live_layout: bool,
}

impl ViewModel {
    fn new(config: &ViewerConfig, payload: GraphPayload) -> Self {
        let mut controller = InteractionController::from_config(config);
        let version = controller.load_payload(payload);
        Self {
            controller,
            version,
            search: String::new(),
            search_hits: Vec::new(),
            hovered: None,
            reload_error: None,
            live_layout: true,
        }
    }

    fn replace_payload(&mut self, payload: GraphPayload) {
        self.version = self.controller.load_payload(payload);
        self.hovered = None;
        self.reload_error = None;
        self.refresh_search();
    }

    fn reload_failed(&mut self, error: String) {
        self.controller.fetch_failed(&error);
        self.reload_error = Some(error);
    }

    fn refresh_search(&mut self) {
        self.search_hits = self.controller.search(&self.search, 12);
    }

    fn show(&mut self, ctx: &Context, path: &Path, reload_requested: &mut bool, is_loading: bool) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("nix-drv-graph");
                    ui.separator();
                    ui.label(format!("file: {}", path.display()));
                    if let Some(payload) = self.controller.payload() {
                        ui.label(format!("nodes: {}", payload.node_count()));
                        ui.label(format!("edges: {}", payload.edge_count()));
                        ui.label(format!(
                            "communities: {}",
                            self.controller.communities().count()
                        ));
                    }
                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }
                    if let Some(error) = &self.reload_error {
                        ui.colored_label(egui::Color32::from_rgb(235, 110, 100), error);
                    }
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }
}

impl GraphViewerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        let state = Self::start_load(&config);
        Self {
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(path: &Path, format: PayloadFormat) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();

        thread::spawn(move || {
            let result = load_payload(&path, format)
                .with_context(|| format!("failed to load {}", path.display()))
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(config: &ViewerConfig) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(&config.payload_path, config.format),
        }
    }
}

impl eframe::App for GraphViewerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(payload)) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            &self.config,
                            payload,
                        ))));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading derivation graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load derivation graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.config));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(
                    ctx,
                    &self.config.payload_path,
                    &mut reload_requested,
                    is_reloading,
                );

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(
                        &self.config.payload_path,
                        self.config.format,
                    ));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(payload)) => model.replace_payload(payload),
                        Ok(Err(error)) => model.reload_failed(error),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.reload_failed("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
