mod form;
mod form_ui;
mod import;
mod io;
mod store;
mod submit;

pub use form::{FormOutcome, MarkerForm, SUGGESTION_LIMIT};
pub use form_ui::{kind_color, marker_form_window};
pub use import::{pick_and_import, ImportStatus};
pub use io::csv_import::{import_markers_from_path, import_markers_from_reader, ImportReport};
pub use store::MarkerStore;
pub use submit::{validate_for_submission, SubmissionClient, FIND_OPTIMAL_LOCATION_PATH};

/// One line for an alert: every message of the error chain, outermost first.
pub fn describe(e: &miette::Report) -> String {
    use itertools::Itertools;
    e.chain().map(|cause| cause.to_string()).join(": ")
}
