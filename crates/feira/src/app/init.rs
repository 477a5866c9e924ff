use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs_utf8::camino::Utf8PathBuf, fs_utf8::Dir};
use miette::{Context, IntoDiagnostic, Result};

pub const DATA_DIR_ENV: &str = "FEIRA_DATA_DIR";

/// Feira data directory
/// We will read a path from env `FEIRA_DATA_DIR` or use data_local_dir/feira,
/// where data_local_dir is platform specific
/// Inside this directory, we store the configuration file and the logs.
pub fn get_feira_path() -> Result<PathBuf> {
    if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        if !env_dir.trim().is_empty() {
            return Ok(PathBuf::from(env_dir));
        }
    }
    if let Some(project_dir) = directories_next::ProjectDirs::from("com.feira", "", "feira") {
        Ok(project_dir.data_local_dir().to_path_buf())
    } else {
        Err(miette::miette!(
            "getting project path failed for some reason"
        ))
    }
}

pub fn get_feira_dir(path: &Path) -> Result<Dir> {
    let authoratah = ambient_authority();
    let feira_path = Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| miette::miette!("{} is not a valid utf-8 path", p.display()))?;

    Dir::create_ambient_dir_all(&feira_path, authoratah)
        .into_diagnostic()
        .wrap_err(feira_path.clone())
        .wrap_err("failed to create feira directory")?;
    Dir::open_ambient_dir(&feira_path, authoratah)
        .into_diagnostic()
        .wrap_err(feira_path)
        .wrap_err("failed to open feira data dir")
}
