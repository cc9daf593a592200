use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::advisor::{default_reference_data, load_reference_data, ReferenceData};

/// Environment variable naming a directory of reference-table overrides.
pub const DATA_DIR_ENV: &str = "LAMINATE_ADVISOR_DATA_DIR";

/// Directory name under the platform config dir (e.g. ~/.config/laminate-advisor/).
pub const APP_DIR_NAME: &str = "laminate-advisor";

/// Where the reference tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// TOML files in a directory; missing files fall back to the embedded copy
    Directory(PathBuf),
    /// Tables compiled into the binary
    Embedded,
}

impl DataSource {
    /// Detect the data source for this process.
    ///
    /// Order: `LAMINATE_ADVISOR_DATA_DIR`, then `<config dir>/laminate-advisor/`
    /// if it exists, then the embedded tables.
    pub fn detect() -> Self {
        Self::detect_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from), dirs::config_dir())
    }

    fn detect_from(env_dir: Option<PathBuf>, config_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
            debug!("Using reference data dir from {}: {:?}", DATA_DIR_ENV, dir);
            return DataSource::Directory(dir);
        }

        if let Some(user_dir) = config_dir.map(|d| d.join(APP_DIR_NAME)) {
            if user_dir.is_dir() {
                debug!("Using reference data dir {:?}", user_dir);
                return DataSource::Directory(user_dir);
            }
        }

        debug!("No reference data dir found, using embedded tables");
        DataSource::Embedded
    }

    /// Load and validate the tables from this source.
    pub fn load(&self) -> Result<ReferenceData> {
        match self {
            DataSource::Directory(dir) => {
                if !dir.is_dir() {
                    bail!("Reference data directory {:?} does not exist", dir);
                }
                info!("Loading reference data from {:?}", dir);
                load_reference_data(dir)
            }
            DataSource::Embedded => {
                info!("Using embedded reference data");
                Ok(default_reference_data())
            }
        }
    }
}

/// Load tables from an explicit directory, or from the detected source when
/// none is given.
pub fn load(data_dir: Option<&Path>) -> Result<ReferenceData> {
    let source = match data_dir {
        Some(dir) => DataSource::Directory(dir.to_path_buf()),
        None => DataSource::detect(),
    };
    source.load()
}
