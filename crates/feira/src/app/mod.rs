use std::{io::Write, sync::Arc};

use cap_std::fs_utf8::Dir;
use egui_window_glfw_passthrough::{glfw::Context as _, GlfwBackend, GlfwConfig};
use feira_map_manager::MapViewKind;
use miette::{IntoDiagnostic, Result};
use tracing::{error, info, info_span};

mod configuration;
mod init;
mod messages;
mod renderer;
mod screen;

use configuration::{FeiraConfiguration, FeiraParameters, CONFIGURATION_FILE_NAME};
use init::{get_feira_dir, get_feira_path};
use messages::MessageToApplicationBack;
use renderer::FeiraRenderer;
use screen::{FeiraScreen, SubmissionStatus};

const INITIAL_WINDOW_WIDTH: i32 = 1024;
const INITIAL_WINDOW_HEIGHT: i32 = 768;

#[derive(Debug, Default)]
pub struct MenuPanel {
    show_configuration_window: bool,
}

struct FeiraGui {
    configuration: FeiraConfiguration,
    menu_panel: MenuPanel,
    screen: FeiraScreen,
    renderer: FeiraRenderer,
    egui_context: egui::Context,
    glfw_backend: GlfwBackend,
}

pub struct Feira {
    gui: Box<FeiraGui>,
    root_dir: Arc<Dir>,
    root_path: std::path::PathBuf,
}

impl Feira {
    pub fn new(root_dir: Arc<Dir>, root_path: std::path::PathBuf) -> Result<Self> {
        let parameters = match FeiraParameters::load(&root_dir) {
            Ok(parameters) => parameters,
            Err(e) => {
                error!(?e, "failed to load configuration, using defaults");
                FeiraParameters::default()
            }
        };
        info!(?parameters, "configuration loaded");

        let egui_context = egui::Context::default();
        let mut glfw_backend = GlfwBackend::new(GlfwConfig {
            glfw_callback: Box::new(|glfw_context| {
                glfw_context.window_hint(
                    egui_window_glfw_passthrough::glfw::WindowHint::SRgbCapable(true),
                );
                glfw_context.window_hint(
                    egui_window_glfw_passthrough::glfw::WindowHint::ContextVersion(4, 6),
                );
            }),
            opengl_window: Some(true),
            transparent_window: Some(false),
            window_title: "Feira".to_string(),
            ..Default::default()
        });
        glfw_backend.window.set_decorated(true);
        glfw_backend
            .window
            .set_size(INITIAL_WINDOW_WIDTH, INITIAL_WINDOW_HEIGHT);

        let renderer = FeiraRenderer::new(&mut glfw_backend);
        let screen = FeiraScreen::new(&parameters);
        let configuration = FeiraConfiguration::new(glfw_backend.glfw.get_time() as _, parameters);

        Ok(Self {
            gui: Box::new(FeiraGui {
                configuration,
                menu_panel: MenuPanel::default(),
                screen,
                renderer,
                egui_context,
                glfw_backend,
            }),
            root_dir,
            root_path,
        })
    }

    fn start_background_loop(
        root_dir: Arc<Dir>,
        u2b_receiver: std::sync::mpsc::Receiver<MessageToApplicationBack>,
    ) {
        let _background_thread = std::thread::spawn(move || {
            let _span_guard = info_span!("background event loop").entered();
            tracing::info!("entering background event loop");
            // ends when the UI drops its sender
            while let Ok(msg) = u2b_receiver.recv() {
                Self::handle_app_message(&root_dir, msg);
            }
            tracing::info!("background event loop finished");
        });
    }

    fn handle_app_message(root_dir: &Dir, msg: MessageToApplicationBack) {
        tracing::trace!("handling message to application back");
        match msg {
            MessageToApplicationBack::SaveConfiguration(serialized_string) => {
                match root_dir.create(CONFIGURATION_FILE_NAME) {
                    Ok(mut file) => {
                        match file.write_all(serialized_string.as_bytes()).into_diagnostic() {
                            Ok(_) => {
                                info!("configuration saved");
                            }
                            Err(e) => {
                                error!(?e, "failed to save configuration");
                            }
                        }
                    }
                    Err(e) => {
                        error!(?e, "failed to open configuration file");
                    }
                }
            }
        }
    }

    pub fn enter_event_loop(self) {
        let (u2b_sender, u2b_receiver) = std::sync::mpsc::channel();
        Self::start_background_loop(Arc::clone(&self.root_dir), u2b_receiver);

        tracing::info!("entering glfw event loop");
        let span_guard = info_span!("glfw event loop").entered();
        let mut gui = *self.gui;
        let root_path = self.root_path;

        loop {
            let FeiraGui {
                configuration,
                menu_panel,
                screen,
                renderer,
                egui_context,
                glfw_backend,
            } = &mut gui;
            let latest_time = glfw_backend.glfw.get_time();

            let etx = egui_context.clone();

            // gather events
            glfw_backend.glfw.poll_events();
            glfw_backend.tick();

            if glfw_backend.window.should_close() {
                tracing::warn!("should close is true. So, exiting event loop");
                break;
            }

            if glfw_backend.resized_event_pending {
                let latest_size = glfw_backend.window.get_framebuffer_size();
                let latest_size = [latest_size.0 as _, latest_size.1 as _];

                glfw_backend.framebuffer_size_physical = latest_size;
                glfw_backend.window_size_logical = [
                    latest_size[0] as f32 / glfw_backend.scale,
                    latest_size[1] as f32 / glfw_backend.scale,
                ];
                renderer.resize_framebuffer(latest_size);
                glfw_backend.resized_event_pending = false;
            }
            renderer.prepare_frame(|| {
                let latest_size = glfw_backend.window.get_framebuffer_size();
                tracing::info!(
                    ?latest_size,
                    "failed to get surface texture, so calling latest framebuffer size"
                );
                let latest_size = [latest_size.0 as _, latest_size.1 as _];
                glfw_backend.framebuffer_size_physical = latest_size;
                glfw_backend.window_size_logical = [
                    latest_size[0] as f32 / glfw_backend.scale,
                    latest_size[1] as f32 / glfw_backend.scale,
                ];
                latest_size
            });

            let mut input = glfw_backend.take_raw_input();
            input.time = Some(latest_time);

            etx.begin_frame(input);

            // do all the non-gui stuff first
            configuration.tick(latest_time);
            screen.tick();

            // do the gui stuff now
            egui::TopBottomPanel::top("menu panel").show(&etx, |ui| {
                egui::menu::bar(ui, |ui| {
                    ui.menu_button("Feira", |ui| {
                        ui.checkbox(&mut menu_panel.show_configuration_window, "Configuração");
                        if ui.button("Limpar marcadores").clicked() {
                            screen.clear_markers();
                            ui.close_menu();
                        }
                        if ui.button("Sair").clicked() {
                            info!("exiting feira");
                            glfw_backend.window.set_should_close(true);
                        }
                    });
                    let importing = screen.is_importing();
                    if ui
                        .add_enabled(!importing, egui::Button::new("Importar CSV"))
                        .clicked()
                    {
                        screen.import();
                    }
                    if importing {
                        ui.spinner();
                    }
                    let running = *screen.submission_status() == SubmissionStatus::Running;
                    if ui
                        .button("Enviar")
                        .on_hover_text("Busca o local ótimo para os marcadores")
                        .clicked()
                    {
                        screen.submit();
                    }
                    if running {
                        ui.spinner();
                    }
                    if ui.button("Limpar resultado").clicked() {
                        screen.clear_result();
                    }
                    ui.separator();
                    let mut kind = screen.map_view_kind();
                    ui.selectable_value(&mut kind, MapViewKind::Canvas, "Mapa");
                    ui.selectable_value(&mut kind, MapViewKind::Table, "Tabela");
                    screen.set_map_view(kind, &configuration.parameters);
                });
            });
            egui::TopBottomPanel::bottom("result panel").show(&etx, |ui| {
                screen.result_panel(ui);
            });
            egui::CentralPanel::default().show(&etx, |ui| {
                screen.map_ui(ui);
            });
            screen.windows(&etx);

            if configuration.gui(
                &u2b_sender,
                &etx,
                &mut menu_panel.show_configuration_window,
                &root_path,
            ) {
                screen.reconfigure(&configuration.parameters);
            }

            // end gui stuff
            etx.request_repaint();

            let egui::FullOutput {
                platform_output,
                textures_delta,
                shapes,
                ..
            } = etx.end_frame();

            if !platform_output.copied_text.is_empty() {
                glfw_backend
                    .window
                    .set_clipboard_string(&platform_output.copied_text);
            }

            renderer.render_egui(
                etx.tessellate(shapes, etx.pixels_per_point()),
                textures_delta,
                glfw_backend.window_size_logical,
            );
            glfw_backend.window.swap_buffers();
        }
        drop(span_guard);
    }
}

pub fn start_feira() {
    let feira_path = match get_feira_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("failed to find feira data path: {e:?}");
            panic!("failed to find feira data path: {e:?}");
        }
    };
    let feira_dir = match get_feira_dir(&feira_path) {
        Ok(fdir) => fdir,
        Err(e) => {
            eprintln!("failed to create feira dir: {e:?}");
            panic!("failed to create feira_dir: {e:?}");
        }
    };

    let log_file_flush_guard = match feira_core::trace::install_tracing(&feira_path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("failed to install tracing: {e:?}");
            panic!("failed to install tracing: {e:?}");
        }
    };

    if let Err(e) = rayon::ThreadPoolBuilder::default()
        .panic_handler(|panic_info| {
            error!(?panic_info, "rayon thread paniced.");
        })
        .build_global()
    {
        error!(
            ?e,
            "failed to set panic handler and build global threadpool for rayon"
        );
    }

    info!(path = %feira_path.display(), "starting feira");
    match Feira::new(feira_dir.into(), feira_path) {
        Ok(feira) => {
            feira.enter_event_loop();
        }
        Err(e) => {
            error!(?e, "failed to create Feira App");
        }
    };
    std::mem::drop(log_file_flush_guard);
}
