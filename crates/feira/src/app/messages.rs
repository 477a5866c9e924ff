use serde::{Deserialize, Serialize};

/// Work the UI thread hands to the background thread.
#[derive(Clone, Serialize, Deserialize)]
pub enum MessageToApplicationBack {
    /// serialized content of the configuration file
    SaveConfiguration(String),
}
