use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::io::csv_import::{import_markers_from_path, ImportReport};

#[derive(Debug, Default)]
pub enum ImportStatus {
    #[default]
    UnInitialized,
    WaitingForFileChooser,
    LoadingFile(std::path::PathBuf),
    Done(String, ImportReport),
    Failed(String),
}

impl ImportStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::WaitingForFileChooser | Self::LoadingFile(_))
    }
    /// Hands the finished status over to the caller and resets it.
    pub fn take_finished(&mut self) -> Option<ImportStatus> {
        match self {
            Self::Done(..) | Self::Failed(_) => Some(std::mem::take(self)),
            _ => None,
        }
    }
}

fn set_status(import_status: &Mutex<ImportStatus>, status: ImportStatus) {
    *import_status.lock().unwrap_or_else(|e| e.into_inner()) = status;
}

/// Called when the user asks for an import. The file dialog blocks, so it runs on the rayon pool
/// and so does the parsing. The UI polls `import_status` every frame.
pub fn pick_and_import(import_status: Arc<Mutex<ImportStatus>>) {
    rayon::spawn(move || {
        set_status(&import_status, ImportStatus::WaitingForFileChooser);

        let Some(file_path) = rfd::FileDialog::new()
            .add_filter("csv", &["csv", "txt"])
            .pick_file()
        else {
            info!("file chooser was cancelled");
            set_status(&import_status, ImportStatus::UnInitialized);
            return;
        };
        set_status(&import_status, ImportStatus::LoadingFile(file_path.clone()));

        let file_name = file_path
            .file_name()
            .map(|ostr| ostr.to_string_lossy().to_string())
            .unwrap_or_default();
        match import_markers_from_path(&file_path) {
            Ok(report) => {
                info!(%file_name, "markers file loaded");
                set_status(&import_status, ImportStatus::Done(file_name, report));
            }
            Err(e) => {
                error!(?e, "failed to import markers");
                set_status(&import_status, ImportStatus::Failed(crate::describe(&e)));
            }
        }
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn take_finished_resets() {
        let mut status = ImportStatus::Done("a.csv".to_string(), ImportReport::default());
        assert!(matches!(status.take_finished(), Some(ImportStatus::Done(..))));
        assert!(matches!(status, ImportStatus::UnInitialized));
        assert!(status.take_finished().is_none());
    }

    #[test]
    fn busy_states() {
        assert!(ImportStatus::WaitingForFileChooser.is_busy());
        assert!(ImportStatus::LoadingFile("x.csv".into()).is_busy());
        assert!(!ImportStatus::Failed("no".to_string()).is_busy());
        assert!(!ImportStatus::UnInitialized.is_busy());
    }
}
