// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A small synthetic dataset and helpful functions for tests.
//!
//! The dataset has 3 antennas and 3 scans:
//!
//! | scan | field | state | times          | data descs |
//! |------|-------|-------|----------------|------------|
//! | 1    | 0     | 0     | T0, T0+10      | 0, 1       |
//! | 2    | 1     | 1     | T0+100, T0+110 | 0, 2       |
//! | 3    | 2     | 2     | T0+200         | 2          |
//!
//! Each (time, data desc) has the baselines in [`BASELINES`], except that
//! scan 2 stores the 0-1 baseline the other way around (1-0). Fields 1 and 2
//! share the name "TARGET". Data desc N points at spw N; spw 1 has 4 channels
//! and is auxiliary. State 2 has no intents.

use marlu::c32;
use ndarray::prelude::*;

use crate::{
    config::CatalogConfig,
    store::{columns, MainRow, MemColumn, MemTable, MemoryStore, MemoryStoreBuilder},
    IndexCatalog,
};

/// The first timestamp \[casacore UTC seconds\].
pub(crate) const T0: f64 = 5_000_000_000.0;

pub(crate) const ANTENNA_NAMES: [&str; 3] = ["ea01", "ea02", "ea03"];

pub(crate) const FIELD_NAMES: [&str; 3] = ["3C286", "TARGET", "TARGET"];

pub(crate) const OBS_MODES: [&str; 3] = [
    "CALIBRATE_FLUX#ON_SOURCE, CALIBRATE_BANDPASS#ON_SOURCE",
    "OBSERVE_TARGET#ON_SOURCE",
    "",
];

pub(crate) const BASELINES: [(i32, i32); 4] = [(0, 0), (0, 1), (0, 2), (1, 2)];

/// The number of channels in each spw.
pub(crate) const NUM_CHANS: [usize; 3] = [8, 4, 16];

/// XX and YY.
pub(crate) const CORR_TYPES: [i32; 2] = [9, 12];

struct ScanSetup {
    scan: i32,
    field: i32,
    state: i32,
    times: &'static [f64],
    data_descs: &'static [i32],
}

const SCANS: [ScanSetup; 3] = [
    ScanSetup {
        scan: 1,
        field: 0,
        state: 0,
        times: &[T0, T0 + 10.0],
        data_descs: &[0, 1],
    },
    ScanSetup {
        scan: 2,
        field: 1,
        state: 1,
        times: &[T0 + 100.0, T0 + 110.0],
        data_descs: &[0, 2],
    },
    ScanSetup {
        scan: 3,
        field: 2,
        state: 2,
        times: &[T0 + 200.0],
        data_descs: &[2],
    },
];

pub(crate) fn main_rows() -> Vec<MainRow> {
    let mut rows = vec![];
    for setup in &SCANS {
        for &time in setup.times {
            for &data_desc in setup.data_descs {
                for &(antenna1, antenna2) in &BASELINES {
                    let (antenna1, antenna2) = if setup.scan == 2 && (antenna1, antenna2) == (0, 1)
                    {
                        (1, 0)
                    } else {
                        (antenna1, antenna2)
                    };
                    rows.push(MainRow {
                        antenna1,
                        antenna2,
                        time,
                        scan: setup.scan,
                        field: setup.field,
                        state: setup.state,
                        data_desc,
                    });
                }
            }
        }
    }
    rows
}

/// The visibility stored in the DATA column.
pub(crate) fn vis_value(row: usize, chan: usize, pol: usize) -> c32 {
    c32::new(row as f32 + 1.0, chan as f32 - pol as f32)
}

pub(crate) fn chan_freqs(spw: usize) -> Vec<f64> {
    (0..NUM_CHANS[spw])
        .map(|i| (spw + 1) as f64 * 1e9 + i as f64 * 1e6)
        .collect()
}

fn strings(s: &[&str]) -> MemColumn {
    MemColumn::Str(s.iter().map(|s| s.to_string()).collect())
}

pub(crate) fn main_table() -> MemTable {
    let rows = main_rows();
    let data = rows
        .iter()
        .enumerate()
        .map(|(i_row, row)| {
            let num_chans = NUM_CHANS[row.data_desc as usize];
            Array2::from_shape_fn((num_chans, CORR_TYPES.len()), |(chan, pol)| {
                vis_value(i_row, chan, pol)
            })
        })
        .collect();
    MemTable::main(&rows).with_column(columns::DATA, MemColumn::Complex(data))
}

pub(crate) fn spw_table() -> MemTable {
    MemTable::new()
        .with_column(
            columns::NUM_CHAN,
            MemColumn::I32(NUM_CHANS.iter().map(|&n| n as i32).collect()),
        )
        .with_column(
            columns::CHAN_FREQ,
            MemColumn::F64Array((0..NUM_CHANS.len()).map(chan_freqs).collect()),
        )
        .with_column(
            columns::CHAN_WIDTH,
            MemColumn::F64Array(NUM_CHANS.iter().map(|&n| vec![1e6; n]).collect()),
        )
        .with_column(columns::NAME, strings(&["SPW0", "SQLD", "SPW2"]))
        .with_column(columns::NET_SIDEBAND, MemColumn::I32(vec![1; 3]))
}

/// Every table of the synthetic dataset, except those named in `skip`.
pub(crate) fn synthetic_builder(skip: &[&str]) -> MemoryStoreBuilder {
    let tables: Vec<(Option<&str>, MemTable)> = vec![
        (None, main_table()),
        (
            Some(columns::ANTENNA_TABLE),
            MemTable::new().with_column(columns::NAME, strings(&ANTENNA_NAMES)),
        ),
        (
            Some(columns::FIELD_TABLE),
            MemTable::new().with_column(columns::NAME, strings(&FIELD_NAMES)),
        ),
        (
            Some(columns::STATE_TABLE),
            MemTable::new().with_column(columns::OBS_MODE, strings(&OBS_MODES)),
        ),
        (
            Some(columns::DATA_DESCRIPTION_TABLE),
            MemTable::new()
                .with_column(columns::SPECTRAL_WINDOW_ID, MemColumn::I32(vec![0, 1, 2]))
                .with_column(columns::POLARIZATION_ID, MemColumn::I32(vec![0; 3])),
        ),
        (Some(columns::SPECTRAL_WINDOW_TABLE), spw_table()),
        (
            Some(columns::POLARIZATION_TABLE),
            MemTable::new().with_column(
                columns::CORR_TYPE,
                MemColumn::I32Array(vec![CORR_TYPES.to_vec()]),
            ),
        ),
    ];

    tables
        .into_iter()
        .filter(|(name, _)| !name.map(|n| skip.contains(&n)).unwrap_or(false))
        .fold(MemoryStoreBuilder::new("synthetic"), |b, (name, table)| {
            b.table(name, table)
        })
}

pub(crate) fn synthetic_store() -> MemoryStore {
    synthetic_builder(&[]).build().unwrap()
}

pub(crate) fn synthetic_catalog() -> IndexCatalog<MemoryStore> {
    IndexCatalog::build(synthetic_store(), CatalogConfig::default()).unwrap()
}
