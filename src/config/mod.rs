// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Settings for building catalogs and row views.
//!
//! All settings have defaults; a config file need only mention the ones it
//! changes. Files may be toml or json, chosen by extension.

mod error;

pub use error::ConfigError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Spectral windows with this many channels are treated as auxiliary
/// (e.g. channel-averaged "square-law detector" windows) and dropped.
pub const DEFAULT_AUXILIARY_NUM_CHANS: usize = 4;

/// The column that row views read visibilities from unless told otherwise.
pub const DEFAULT_DATA_COLUMN: &str = "DATA";

#[derive(Debug, Display, EnumIter, EnumString)]
enum ConfigFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

lazy_static::lazy_static! {
    static ref CONFIG_FILE_TYPES_COMMA_SEPARATED: String = ConfigFileType::iter().join(", ");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Should auxiliary spectral windows be left out of the catalog?
    pub drop_auxiliary_spws: bool,

    /// The number of channels that marks a spectral window as auxiliary.
    pub auxiliary_num_chans: usize,

    /// The visibility column read by row views.
    pub data_column: String,

    /// Should row views re-read their data as soon as their criteria change?
    pub auto_materialize: bool,

    /// How far outside a scan's first and last timestamps \[seconds\] a time
    /// may be and still belong to the scan.
    pub scan_time_tolerance: f64,
}

impl Default for CatalogConfig {
    fn default() -> CatalogConfig {
        CatalogConfig {
            drop_auxiliary_spws: true,
            auxiliary_num_chans: DEFAULT_AUXILIARY_NUM_CHANS,
            data_column: DEFAULT_DATA_COLUMN.to_string(),
            auto_materialize: true,
            scan_time_tolerance: 0.0,
        }
    }
}

impl CatalogConfig {
    /// Read a config from a toml or json file.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<CatalogConfig, ConfigError> {
        fn inner(file: &Path) -> Result<CatalogConfig, ConfigError> {
            let file_path = PathBuf::from(file);
            debug!("Attempting to parse config file {} ...", file_path.display());

            let mut contents = String::new();
            let file_type = file_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .and_then(|e| ConfigFileType::from_str(&e).ok());
            let config: CatalogConfig = match file_type {
                Some(ConfigFileType::Toml) => {
                    debug!("Parsing toml file...");
                    let mut fh = File::open(file)?;
                    fh.read_to_string(&mut contents)?;
                    toml::from_str(&contents).map_err(|e| ConfigError::TomlDecode {
                        file: file_path.display().to_string(),
                        err: e.to_string(),
                    })?
                }

                Some(ConfigFileType::Json) => {
                    debug!("Parsing json file...");
                    let mut fh = File::open(file)?;
                    fh.read_to_string(&mut contents)?;
                    serde_json::from_str(&contents).map_err(|e| ConfigError::JsonDecode {
                        file: file_path.display().to_string(),
                        err: e.to_string(),
                    })?
                }

                None => {
                    return Err(ConfigError::UnrecognisedFileExt(
                        file_path.display().to_string(),
                    ))
                }
            };
            config.validate()?;
            Ok(config)
        }
        inner(file.as_ref())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_time_tolerance.is_nan() || self.scan_time_tolerance < 0.0 {
            return Err(ConfigError::BadTolerance(self.scan_time_tolerance));
        }
        Ok(())
    }

    /// Is a spectral window with this many channels left out of the catalog?
    pub fn drops_spw_with(&self, num_chans: usize) -> bool {
        self.drop_auxiliary_spws && num_chans == self.auxiliary_num_chans
    }
}
