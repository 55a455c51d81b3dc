// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Spectral window and polarisation setup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The frequency setup of a spectral window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpwInfo {
    /// The row of this spectral window in the SPECTRAL_WINDOW table.
    pub id: usize,

    /// Not all writers fill this in.
    pub name: Option<String>,

    pub num_chans: usize,

    /// The centre frequencies of each channel \[Hz\].
    pub chan_freqs: Vec<f64>,

    /// \[Hz\]. Empty if the table doesn't have a CHAN_WIDTH column.
    pub chan_widths: Vec<f64>,

    /// \[Hz\]
    pub total_bandwidth: f64,

    /// +1 for upper sideband, -1 for lower.
    pub net_sideband: i32,

    /// \[Hz\]
    pub ref_freq: Option<f64>,

    /// The mean of the channel frequencies \[Hz\].
    pub mean_freq: f64,
}

impl SpwInfo {
    pub(crate) fn mean(chan_freqs: &[f64]) -> f64 {
        if chan_freqs.is_empty() {
            f64::NAN
        } else {
            chan_freqs.iter().sum::<f64>() / chan_freqs.len() as f64
        }
    }
}

/// A correlation product, as enumerated by casacore's Stokes types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrType {
    I,
    Q,
    U,
    V,
    RR,
    RL,
    LR,
    LL,
    XX,
    XY,
    YX,
    YY,
    Other(i32),
}

impl From<i32> for CorrType {
    fn from(value: i32) -> CorrType {
        match value {
            1 => CorrType::I,
            2 => CorrType::Q,
            3 => CorrType::U,
            4 => CorrType::V,
            5 => CorrType::RR,
            6 => CorrType::RL,
            7 => CorrType::LR,
            8 => CorrType::LL,
            9 => CorrType::XX,
            10 => CorrType::XY,
            11 => CorrType::YX,
            12 => CorrType::YY,
            other => CorrType::Other(other),
        }
    }
}

impl fmt::Display for CorrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrType::Other(v) => write!(f, "Stokes({v})"),
            named => write!(f, "{named:?}"),
        }
    }
}
