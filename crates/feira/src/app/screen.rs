use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use feira_core::task::AsyncTaskGuard;
use feira_map_manager::{MapInteraction, MapScene, MapView, MapViewKind};
use feira_marker_manager::{
    describe, marker_form_window, pick_and_import, validate_for_submission, ImportStatus,
    MarkerForm, MarkerStore, SubmissionClient,
};
use feira_marker_models::{Marker, OptimizationResult};
use tracing::{error, info, warn};

use super::configuration::FeiraParameters;

type SubmissionTask = AsyncTaskGuard<Vec<Marker>, Result<OptimizationResult, String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Import,
    Submission,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Running,
    Done,
    Failed(String),
}

/// Everything the window shows, and the glue between the managers.
pub struct FeiraScreen {
    store: MarkerStore,
    form: Option<MarkerForm>,
    form_error: Option<String>,
    map_view: Box<dyn MapView>,
    map_view_kind: MapViewKind,
    import_status: Arc<Mutex<ImportStatus>>,
    last_import: Option<String>,
    /// server URL and timeout the worker was built with
    submission_settings: (String, Option<u64>),
    submission: Result<SubmissionTask, String>,
    submission_status: SubmissionStatus,
    result: Option<OptimizationResult>,
    alerts: VecDeque<Alert>,
}

fn submission_settings(parameters: &FeiraParameters) -> (String, Option<u64>) {
    (parameters.server_url.clone(), parameters.request_timeout_secs)
}

fn submission_task(parameters: &FeiraParameters) -> Result<SubmissionTask, String> {
    let client = SubmissionClient::new(&parameters.server_url, parameters.request_timeout())
        .map_err(|e| {
            error!(?e, server_url = %parameters.server_url, "invalid server configuration");
            describe(&e)
        })?;
    Ok(AsyncTaskGuard::new(move |markers: Vec<Marker>| {
        client.find_optimal_location(&markers).map_err(|e| {
            error!(?e, "failed to find optimal location");
            describe(&e)
        })
    }))
}

impl FeiraScreen {
    pub fn new(parameters: &FeiraParameters) -> Self {
        Self {
            store: MarkerStore::new(),
            form: None,
            form_error: None,
            map_view: parameters.map_view.build(parameters.viewport()),
            map_view_kind: parameters.map_view,
            import_status: Default::default(),
            last_import: None,
            submission_settings: submission_settings(parameters),
            submission: submission_task(parameters),
            submission_status: SubmissionStatus::Idle,
            result: None,
            alerts: VecDeque::new(),
        }
    }

    /// Only a new server URL or timeout replaces the worker.
    /// A result still in flight on the old one is dropped.
    pub fn reconfigure(&mut self, parameters: &FeiraParameters) {
        let settings = submission_settings(parameters);
        if settings != self.submission_settings {
            info!(
                server_url = %parameters.server_url,
                timeout = ?parameters.request_timeout_secs,
                "replacing submission worker"
            );
            self.submission = submission_task(parameters);
            self.submission_settings = settings;
            if self.submission_status == SubmissionStatus::Running {
                self.submission_status = SubmissionStatus::Idle;
            }
        }
        self.set_map_view(parameters.map_view, parameters);
    }

    pub fn set_map_view(&mut self, kind: MapViewKind, parameters: &FeiraParameters) {
        if kind == self.map_view_kind {
            return;
        }
        let previous = self.map_view.name();
        self.map_view = kind.build(parameters.viewport());
        self.map_view.request_fit();
        self.map_view_kind = kind;
        info!(from = previous, to = self.map_view.name(), "map view switched");
    }

    pub fn map_view_name(&self) -> &'static str {
        self.map_view.name()
    }

    pub fn map_view_kind(&self) -> MapViewKind {
        self.map_view_kind
    }

    fn alert(&mut self, kind: AlertKind, message: String) {
        warn!(?kind, %message, "alert");
        self.alerts.push_back(Alert { kind, message });
    }

    pub fn is_importing(&self) -> bool {
        self.import_status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_busy()
    }

    pub fn import(&mut self) {
        if self.is_importing() {
            return;
        }
        pick_and_import(Arc::clone(&self.import_status));
    }

    pub fn submission_status(&self) -> &SubmissionStatus {
        &self.submission_status
    }

    /// Sends a snapshot of the markers. Nothing is sent when the preflight check fails.
    pub fn submit(&mut self) {
        let markers = self.store.snapshot();
        if let Err(e) = validate_for_submission(&markers) {
            self.alert(AlertKind::Submission, describe(&e));
            return;
        }
        let sent = match &self.submission {
            Ok(task) => task
                .send(markers)
                .map_err(|_| "submission worker has stopped".to_string()),
            Err(e) => Err(e.clone()),
        };
        match sent {
            Ok(()) => {
                info!(markers = self.store.len(), "submission sent");
                self.submission_status = SubmissionStatus::Running;
            }
            Err(e) => {
                self.submission_status = SubmissionStatus::Failed(e.clone());
                self.alert(AlertKind::Submission, e);
            }
        }
    }

    pub fn clear_result(&mut self) {
        self.result = None;
        if !matches!(self.submission_status, SubmissionStatus::Running) {
            self.submission_status = SubmissionStatus::Idle;
        }
    }

    pub fn clear_markers(&mut self) {
        self.store.replace_all(Vec::new());
        self.form = None;
        self.form_error = None;
    }

    /// Collects what the background work finished since the last frame.
    pub fn tick(&mut self) {
        let finished = self
            .import_status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take_finished();
        match finished {
            Some(ImportStatus::Done(file_name, report)) => {
                let imported = self.store.extend(report.markers);
                let total = self.store.len();
                info!(%file_name, imported, skipped = report.skipped, total, "markers imported");
                self.last_import = Some(if report.skipped > 0 {
                    let skipped = report.skipped;
                    format!("{file_name}: {imported} marcadores, {skipped} linhas ignoradas")
                } else {
                    format!("{file_name}: {imported} marcadores")
                });
                self.map_view.request_fit();
            }
            Some(ImportStatus::Failed(message)) => self.alert(AlertKind::Import, message),
            _ => {}
        }

        let (received, still_running) = match &self.submission {
            Ok(task) => {
                let received: Vec<_> = std::iter::from_fn(|| task.try_recv()).collect();
                (received, task.is_running())
            }
            Err(_) => (Vec::new(), false),
        };
        for result in received {
            self.receive(result, still_running);
        }
    }

    /// The last result received wins, older ones still in the queue are overwritten.
    /// The status stays Running while the worker still has submissions to answer.
    fn receive(&mut self, result: Result<OptimizationResult, String>, still_running: bool) {
        match result {
            Ok(result) => {
                info!(
                    optimal = %result.optimal_location_coord,
                    total_cost = result.total_cost,
                    routes = result.routes.len(),
                    "optimal location received"
                );
                self.result = Some(result);
                self.submission_status = SubmissionStatus::Done;
                self.map_view.request_fit();
            }
            Err(message) => {
                self.submission_status = SubmissionStatus::Failed(message.clone());
                self.alert(AlertKind::Submission, message);
            }
        }
        if still_running {
            self.submission_status = SubmissionStatus::Running;
        }
    }

    fn on_map_interaction(&mut self, interaction: MapInteraction) {
        tracing::trace!(?interaction, "map interaction");
        self.form_error = None;
        self.form = match interaction {
            MapInteraction::NewMarker(coords) => Some(MarkerForm::new_at(coords)),
            MapInteraction::EditMarker(index) => match self.store.get(index) {
                Some(marker) => Some(MarkerForm::edit(index, &marker)),
                None => {
                    warn!(index, "clicked marker is gone");
                    None
                }
            },
        };
    }

    pub fn result_panel(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("{} marcadores", self.store.len()));
            if let Some(last_import) = &self.last_import {
                ui.separator();
                ui.label(last_import);
            }
            ui.separator();
            match &self.submission_status {
                SubmissionStatus::Idle => {}
                SubmissionStatus::Running => {
                    ui.spinner();
                    ui.label("calculando...");
                }
                SubmissionStatus::Done => {}
                SubmissionStatus::Failed(_) => {
                    ui.colored_label(egui::Color32::RED, "falha no envio");
                }
            }
            if let Some(result) = &self.result {
                ui.strong(format!(
                    "Local ótimo: {} · custo total {:.2}",
                    result.optimal_location_coord, result.total_cost
                ));
            }
        });
    }

    pub fn map_ui(&mut self, ui: &mut egui::Ui) {
        let markers = self.store.snapshot();
        let scene = MapScene::build(&markers, self.result.as_ref());
        if let Some(interaction) = self.map_view.show(ui, &scene) {
            self.on_map_interaction(interaction);
        }
    }

    pub fn windows(&mut self, etx: &egui::Context) {
        if let Some(form) = self.form.as_mut() {
            if let Some(outcome) = marker_form_window(etx, form, &mut self.form_error) {
                let index = form.index();
                match self.store.apply(outcome, index) {
                    Ok(()) => {
                        self.form = None;
                        self.form_error = None;
                    }
                    Err(e) => {
                        error!(?e, ?index, "failed to apply marker form");
                        self.form_error = Some(describe(&e));
                    }
                }
            }
        }

        if let Some(alert) = self.alerts.front() {
            let mut dismissed = false;
            let title = match alert.kind {
                AlertKind::Import => "Erro na importação",
                AlertKind::Submission => "Erro no envio",
            };
            egui::Window::new(title)
                .id(egui::Id::new("feira alert"))
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(etx, |ui| {
                    ui.label(&alert.message);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            if dismissed {
                self.alerts.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use feira_marker_models::{Coords, MarkerKind};

    fn parameters(server_url: &str) -> FeiraParameters {
        FeiraParameters {
            server_url: server_url.to_string(),
            ..Default::default()
        }
    }

    fn result() -> OptimizationResult {
        OptimizationResult {
            optimal_location_coord: Coords::new(-23.5, -46.6),
            total_cost: 3.0,
            routes: Vec::new(),
        }
    }

    #[test]
    fn preflight_failure_raises_a_submission_alert() {
        let mut screen = FeiraScreen::new(&parameters("http://127.0.0.1:9"));
        screen
            .store
            .push(Marker::new(MarkerKind::Mercado, Coords::new(-23.5, -46.6)));
        screen.submit();
        assert_eq!(screen.alerts.len(), 1);
        assert_eq!(screen.alerts[0].kind, AlertKind::Submission);
        assert_eq!(screen.submission_status, SubmissionStatus::Idle);
    }

    #[test]
    fn invalid_server_url_is_reported_on_submit() {
        let mut screen = FeiraScreen::new(&parameters("not a url"));
        assert!(screen.submission.is_err());
        screen
            .store
            .push(Marker::new(MarkerKind::Mercado, Coords::new(-23.5, -46.6)));
        screen
            .store
            .push(Marker::new(MarkerKind::Produtor, Coords::new(-23.4, -46.5)));
        screen.submit();
        assert!(matches!(screen.submission_status, SubmissionStatus::Failed(_)));
        assert_eq!(screen.alerts[0].kind, AlertKind::Submission);
    }

    #[test]
    fn finished_import_is_appended() {
        let mut screen = FeiraScreen::new(&parameters("http://127.0.0.1:9"));
        screen
            .store
            .push(Marker::new(MarkerKind::Mercado, Coords::new(-23.5, -46.6)));
        *screen.import_status.lock().unwrap() = ImportStatus::Done(
            "feira.csv".to_string(),
            feira_marker_manager::ImportReport {
                markers: vec![Marker::new(MarkerKind::Produtor, Coords::new(-23.4, -46.5))],
                skipped: 2,
            },
        );
        screen.tick();
        assert_eq!(screen.store.len(), 2);
        assert!(screen.alerts.is_empty());
        assert_eq!(
            screen.last_import.as_deref(),
            Some("feira.csv: 1 marcadores, 2 linhas ignoradas")
        );
        assert!(matches!(
            *screen.import_status.lock().unwrap(),
            ImportStatus::UnInitialized
        ));
    }

    #[test]
    fn failed_import_raises_an_import_alert() {
        let mut screen = FeiraScreen::new(&parameters("http://127.0.0.1:9"));
        *screen.import_status.lock().unwrap() = ImportStatus::Failed("broken".to_string());
        screen.tick();
        assert_eq!(
            screen.alerts.front(),
            Some(&Alert {
                kind: AlertKind::Import,
                message: "broken".to_string()
            })
        );
    }

    #[test]
    fn last_result_wins() {
        let mut screen = FeiraScreen::new(&parameters("http://127.0.0.1:9"));
        screen.receive(Err("timeout".to_string()), true);
        assert_eq!(screen.submission_status, SubmissionStatus::Running);
        screen.receive(Ok(result()), false);
        assert_eq!(screen.submission_status, SubmissionStatus::Done);
        assert_eq!(screen.result, Some(result()));
        assert_eq!(screen.alerts.len(), 1);

        screen.clear_result();
        assert_eq!(screen.result, None);
        assert_eq!(screen.submission_status, SubmissionStatus::Idle);
    }

    #[test]
    fn map_click_opens_the_form() {
        let mut screen = FeiraScreen::new(&parameters("http://127.0.0.1:9"));
        screen
            .store
            .push(Marker::new(MarkerKind::Produtor, Coords::new(-23.4, -46.5)));
        screen.on_map_interaction(MapInteraction::EditMarker(0));
        assert_eq!(screen.form.as_ref().and_then(MarkerForm::index), Some(0));
        screen.on_map_interaction(MapInteraction::EditMarker(7));
        assert!(screen.form.is_none());
        screen.on_map_interaction(MapInteraction::NewMarker(Coords::new(1.0, 2.0)));
        assert!(screen.form.as_ref().is_some_and(MarkerForm::is_new));
    }

    fn submittable(screen: &FeiraScreen) {
        screen
            .store
            .push(Marker::new(MarkerKind::Mercado, Coords::new(-23.5, -46.6)));
        screen
            .store
            .push(Marker::new(MarkerKind::Produtor, Coords::new(-23.4, -46.5)));
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn unreachable_server_ends_in_failure() {
        let mut screen = FeiraScreen::new(&FeiraParameters {
            request_timeout_secs: Some(5),
            ..parameters(&closed_port_url())
        });
        submittable(&screen);
        screen.submit();
        assert_eq!(screen.submission_status, SubmissionStatus::Running);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while screen.submission_status == SubmissionStatus::Running {
            assert!(std::time::Instant::now() < deadline, "submission never finished");
            std::thread::sleep(std::time::Duration::from_millis(10));
            screen.tick();
        }
        assert!(matches!(screen.submission_status, SubmissionStatus::Failed(_)));
        assert_eq!(screen.alerts.len(), 1);
        assert_eq!(screen.alerts[0].kind, AlertKind::Submission);
    }

    #[test]
    fn map_view_change_keeps_the_submission_in_flight() {
        let base = parameters("http://127.0.0.1:9");
        let mut screen = FeiraScreen::new(&base);
        screen.submission_status = SubmissionStatus::Running;

        let table = FeiraParameters {
            map_view: MapViewKind::Table,
            ..base.clone()
        };
        screen.reconfigure(&table);
        assert_eq!(screen.submission_status, SubmissionStatus::Running);
        assert_eq!(screen.map_view_kind(), MapViewKind::Table);
        assert_eq!(screen.map_view_name(), "table");

        let other_server = FeiraParameters {
            server_url: "http://127.0.0.1:10".to_string(),
            ..table
        };
        screen.reconfigure(&other_server);
        assert_eq!(screen.submission_status, SubmissionStatus::Idle);
        assert_eq!(screen.submission_settings.0, "http://127.0.0.1:10");
    }

    #[test]
    fn marker_without_coordinates_can_be_deleted() {
        let mut screen = FeiraScreen::new(&parameters("http://127.0.0.1:9"));
        screen
            .store
            .push(Marker::new(MarkerKind::Produtor, Coords::new(f64::NAN, f64::NAN)));
        submittable(&screen);
        assert!(validate_for_submission(&screen.store.snapshot()).is_err());

        let scene = MapScene::build(&screen.store.snapshot(), None);
        assert_eq!(scene.unplaced[0].index, 0);
        screen.on_map_interaction(MapInteraction::EditMarker(scene.unplaced[0].index));
        let form = screen.form.take().unwrap();
        assert_eq!(form.index(), Some(0));
        screen.store.apply(form.delete(), form.index()).unwrap();

        assert_eq!(screen.store.len(), 2);
        assert!(validate_for_submission(&screen.store.snapshot()).is_ok());
    }
}
