use std::time::Duration;

use cap_std::fs_utf8::Dir;
use feira_map_manager::{MapViewKind, Viewport};
use feira_marker_models::Coords;
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use super::messages::MessageToApplicationBack;

pub const CONFIGURATION_FILE_NAME: &str = "config.toml";
pub const SERVER_URL_ENV: &str = "FEIRA_SERVER_URL";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeiraParameters {
    pub server_url: String,
    /// no timeout when absent
    pub request_timeout_secs: Option<u64>,
    pub map_view: MapViewKind,
    pub initial_center: Coords,
    pub initial_zoom: f64,
}

impl Default for FeiraParameters {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: None,
            map_view: MapViewKind::default(),
            initial_center: viewport.center,
            initial_zoom: viewport.zoom,
        }
    }
}

impl FeiraParameters {
    /// A missing file gives the defaults, a broken one is an error.
    pub fn load(root_dir: &Dir) -> Result<Self> {
        let parameters = if root_dir.exists(CONFIGURATION_FILE_NAME) {
            let content = root_dir
                .read_to_string(CONFIGURATION_FILE_NAME)
                .into_diagnostic()
                .wrap_err("failed to read configuration file")?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        Ok(parameters.with_server_url_override(std::env::var(SERVER_URL_ENV).ok()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .into_diagnostic()
            .wrap_err("invalid configuration file")
    }

    pub fn with_server_url_override(mut self, server_url: Option<String>) -> Self {
        if let Some(server_url) = server_url.filter(|s| !s.trim().is_empty()) {
            self.server_url = server_url.trim().to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.initial_center, self.initial_zoom)
    }
}

pub struct FeiraConfiguration {
    pub fps_last_reset: f64,
    pub frame_count: u32,
    pub total_frame_count: u32,
    pub average_fps: u32,
    pub parameters: FeiraParameters,
    server_url_edit: String,
    timeout_edit: String,
    edit_error: Option<String>,
}

impl FeiraConfiguration {
    pub fn new(current_time: f64, parameters: FeiraParameters) -> Self {
        Self {
            fps_last_reset: current_time,
            frame_count: 0,
            total_frame_count: 0,
            average_fps: 0,
            server_url_edit: parameters.server_url.clone(),
            timeout_edit: parameters
                .request_timeout_secs
                .map(|s| s.to_string())
                .unwrap_or_default(),
            edit_error: None,
            parameters,
        }
    }

    pub fn tick(&mut self, current_time: f64) {
        self.total_frame_count += 1;
        self.frame_count += 1;
        if current_time - self.fps_last_reset > 1.0 {
            self.average_fps = self.frame_count;
            self.frame_count = 0;
            self.fps_last_reset = current_time;
        }
    }

    /// Validates the text fields, an empty timeout means none.
    fn apply_edits(&mut self) -> Result<(), String> {
        let server_url = self.server_url_edit.trim();
        if server_url.is_empty() {
            return Err("server URL cannot be empty".to_string());
        }
        let timeout = self.timeout_edit.trim();
        let request_timeout_secs = if timeout.is_empty() {
            None
        } else {
            Some(
                timeout
                    .parse::<u64>()
                    .map_err(|_| format!("invalid timeout '{timeout}'"))?,
            )
        };
        self.parameters.server_url = server_url.to_string();
        self.parameters.request_timeout_secs = request_timeout_secs;
        Ok(())
    }

    /// Returns true when the parameters changed this frame.
    pub fn gui(
        &mut self,
        u2b_sender: &std::sync::mpsc::Sender<MessageToApplicationBack>,
        etx: &egui::Context,
        open: &mut bool,
        root_path: &std::path::Path,
    ) -> bool {
        let mut need_to_save = false;
        egui::Window::new("Configuração")
            .open(open)
            .show(etx, |ui| {
                egui::Grid::new("configuration details")
                    .num_columns(2)
                    .show(ui, |ui| {
                        ui.label("FPS");
                        ui.label(format!("{}", self.average_fps));
                        ui.end_row();
                        ui.label("Frame count");
                        ui.label(format!("{}", self.total_frame_count));
                        ui.end_row();

                        ui.label("Servidor")
                            .on_hover_text("Base URL of the optimization server");
                        ui.text_edit_singleline(&mut self.server_url_edit);
                        ui.end_row();
                        ui.label("Timeout (s)").on_hover_text(
                            "Leave empty to wait for the server as long as it takes",
                        );
                        ui.text_edit_singleline(&mut self.timeout_edit);
                        ui.end_row();

                        ui.label("Mapa");
                        ui.horizontal(|ui| {
                            for (kind, label) in
                                [(MapViewKind::Canvas, "Canvas"), (MapViewKind::Table, "Tabela")]
                            {
                                if ui
                                    .selectable_label(self.parameters.map_view == kind, label)
                                    .clicked()
                                    && self.parameters.map_view != kind
                                {
                                    self.parameters.map_view = kind;
                                    need_to_save = true;
                                }
                            }
                        });
                        ui.end_row();

                        ui.label("All files and preferences are saved into:");
                        ui.label(root_path.display().to_string());
                        ui.end_row();
                    });
                if let Some(e) = &self.edit_error {
                    ui.colored_label(egui::Color32::RED, e);
                }
                if ui.button("Aplicar").clicked() {
                    match self.apply_edits() {
                        Ok(()) => {
                            self.edit_error = None;
                            need_to_save = true;
                        }
                        Err(e) => self.edit_error = Some(e),
                    }
                }
            });
        if need_to_save {
            match toml::to_string(&self.parameters) {
                Ok(serialized_string) => {
                    let _ = u2b_sender
                        .send(MessageToApplicationBack::SaveConfiguration(serialized_string));
                }
                Err(e) => {
                    tracing::error!(?e, "failed to serialize configuration");
                }
            }
        }
        need_to_save
    }
}
