// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with building and querying an index catalog.

use thiserror::Error;

use crate::{config::ConfigError, resolver::NameKind, store::StoreError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("The index catalog for {dataset} has not been built; rebuild() must be called before it is queried")]
    NotBuilt { dataset: String },

    #[error("The index catalog does not track {key}")]
    MissingKey { key: String },

    #[error("There is no {kind} with ID {id}")]
    IdOutOfRange { kind: NameKind, id: i64 },

    #[error("Found a negative value ({value}) in the {column} column; these must be positive")]
    NegativeId { column: &'static str, value: i32 },

    #[error("Found an antenna number ({0}), but this is bigger than the total number of antennas in the antenna table.")]
    AntennaNumTooBig(i32),

    #[error("The main table of the dataset contains no rows!")]
    MainTableEmpty,

    #[error("The antenna table of the dataset contains no rows!")]
    AntennaTableEmpty,

    #[error("Spectral window {spw} claims {num_chans} channels, but has {num_freqs} channel frequencies")]
    ChanFreqMismatch {
        spw: usize,
        num_chans: usize,
        num_freqs: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Is this error the result of asking the catalog for something it can't
    /// know about (as opposed to a legitimately empty answer, which is never
    /// an error)?
    pub fn is_missing_key(&self) -> bool {
        matches!(
            self,
            CatalogError::NotBuilt { .. } | CatalogError::MissingKey { .. }
        )
    }
}
