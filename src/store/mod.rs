// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Access to columnar tables.
//!
//! Everything in this crate reads data through the [`ColumnStore`] and
//! [`TableHandle`] traits. [`MsStore`] reads CASA measurement sets from disk,
//! and [`MemoryStore`] holds a dataset in memory (useful when the metadata
//! was obtained some other way, and for testing).

mod error;
mod memory;
mod ms;

pub use error::StoreError;
pub use memory::{MainRow, MemColumn, MemTable, MemTableHandle, MemoryStore, MemoryStoreBuilder};
pub use ms::{MsStore, MsTable};

use std::ops::Range;

use marlu::c32;
use ndarray::prelude::*;

use crate::predicate::{Predicate, RowKeys};

/// Measurement set table and column names.
pub mod columns {
    pub const ANTENNA1: &str = "ANTENNA1";
    pub const ANTENNA2: &str = "ANTENNA2";
    pub const DATA_DESC_ID: &str = "DATA_DESC_ID";
    pub const FIELD_ID: &str = "FIELD_ID";
    pub const STATE_ID: &str = "STATE_ID";
    pub const SCAN_NUMBER: &str = "SCAN_NUMBER";
    pub const TIME: &str = "TIME";
    pub const DATA: &str = "DATA";

    pub const NAME: &str = "NAME";
    pub const OBS_MODE: &str = "OBS_MODE";
    pub const SPECTRAL_WINDOW_ID: &str = "SPECTRAL_WINDOW_ID";
    pub const POLARIZATION_ID: &str = "POLARIZATION_ID";
    pub const NUM_CHAN: &str = "NUM_CHAN";
    pub const CHAN_FREQ: &str = "CHAN_FREQ";
    pub const CHAN_WIDTH: &str = "CHAN_WIDTH";
    pub const TOTAL_BANDWIDTH: &str = "TOTAL_BANDWIDTH";
    pub const NET_SIDEBAND: &str = "NET_SIDEBAND";
    pub const REF_FREQUENCY: &str = "REF_FREQUENCY";
    pub const CORR_TYPE: &str = "CORR_TYPE";

    /// What the main table is called in messages.
    pub const MAIN_TABLE: &str = "MAIN";
    pub const ANTENNA_TABLE: &str = "ANTENNA";
    pub const FIELD_TABLE: &str = "FIELD";
    pub const STATE_TABLE: &str = "STATE";
    pub const DATA_DESCRIPTION_TABLE: &str = "DATA_DESCRIPTION";
    pub const SPECTRAL_WINDOW_TABLE: &str = "SPECTRAL_WINDOW";
    pub const POLARIZATION_TABLE: &str = "POLARIZATION";
}

/// A dataset made of a main table and named subtables.
pub trait ColumnStore {
    type Table: TableHandle;

    /// Open a table. If `subtable` is `None`, then open the main table. The
    /// table is closed when the handle is dropped.
    fn open(&self, subtable: Option<&str>) -> Result<Self::Table, StoreError>;

    /// Does the named subtable exist? Some subtables (e.g. STATE) are optional.
    fn has_subtable(&self, subtable: &str) -> bool;

    /// Something to identify this dataset with in messages.
    fn description(&self) -> String;
}

/// An open table.
pub trait TableHandle {
    fn n_rows(&self) -> u64;

    fn has_column(&mut self, column: &str) -> Result<bool, StoreError>;

    fn i32_column(&mut self, column: &str) -> Result<Vec<i32>, StoreError>;

    fn f64_column(&mut self, column: &str) -> Result<Vec<f64>, StoreError>;

    fn string_column(&mut self, column: &str) -> Result<Vec<String>, StoreError>;

    fn i32_cell(&mut self, column: &str, row: u64) -> Result<i32, StoreError>;

    /// Read an array-valued cell, flattened.
    fn f64_cell_vec(&mut self, column: &str, row: u64) -> Result<Vec<f64>, StoreError>;

    /// Read an array-valued cell, flattened.
    fn i32_cell_vec(&mut self, column: &str, row: u64) -> Result<Vec<i32>, StoreError>;

    /// Read the complex-valued cells of the given rows. Each cell is arranged
    /// \[channel\]\[polarisation\]; the result is stacked as
    /// \[pol\]\[chan\]\[row\].
    fn vis_cells(&mut self, column: &str, rows: &RowSet) -> Result<Array3<c32>, StoreError>;

    /// Find the rows that satisfy the predicate.
    fn query(&mut self, predicate: &Predicate) -> Result<RowSet, StoreError>;

    /// The [`RowKeys`] of every row in this table. Only makes sense for a
    /// main table.
    fn row_keys(&mut self) -> Result<Vec<RowKeys>, StoreError> {
        let antenna1 = self.i32_column(columns::ANTENNA1)?;
        let antenna2 = self.i32_column(columns::ANTENNA2)?;
        let data_desc_id = self.i32_column(columns::DATA_DESC_ID)?;
        let field_id = self.i32_column(columns::FIELD_ID)?;
        let state_id = self.i32_column(columns::STATE_ID)?;
        let scan_number = self.i32_column(columns::SCAN_NUMBER)?;
        Ok((0..antenna1.len())
            .map(|i| RowKeys {
                antenna1: antenna1[i],
                antenna2: antenna2[i],
                data_desc_id: data_desc_id[i],
                field_id: field_id[i],
                state_id: state_id[i],
                scan_number: scan_number[i],
            })
            .collect())
    }

    /// Read a column, keeping only the values of the given rows.
    fn i32_column_for(&mut self, column: &str, rows: &RowSet) -> Result<Vec<i32>, StoreError> {
        let values = self.i32_column(column)?;
        rows.pick(&values)
    }

    /// Read a column, keeping only the values of the given rows.
    fn f64_column_for(&mut self, column: &str, rows: &RowSet) -> Result<Vec<f64>, StoreError> {
        let values = self.f64_column(column)?;
        rows.pick(&values)
    }
}

/// An ascending, duplicate-free set of main-table row indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<u64>,
}

impl RowSet {
    pub fn new(mut rows: Vec<u64>) -> RowSet {
        rows.sort_unstable();
        rows.dedup();
        RowSet { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.rows.iter().copied()
    }

    pub fn contains(&self, row: u64) -> bool {
        self.rows.binary_search(&row).is_ok()
    }

    /// Runs of consecutive rows. Stores that read cells row-range by row-range
    /// use these to keep the number of reads down.
    pub fn runs(&self) -> Vec<Range<u64>> {
        let mut runs: Vec<Range<u64>> = vec![];
        for &row in &self.rows {
            if let Some(run) = runs.last_mut() {
                if run.end == row {
                    run.end += 1;
                    continue;
                }
            }
            runs.push(row..row + 1);
        }
        runs
    }

    /// Take the values belonging to these rows out of a whole column.
    pub fn pick<T: Copy>(&self, values: &[T]) -> Result<Vec<T>, StoreError> {
        self.rows
            .iter()
            .map(|&row| {
                values
                    .get(row as usize)
                    .copied()
                    .ok_or(StoreError::RowOutOfRange {
                        row,
                        n_rows: values.len() as u64,
                    })
            })
            .collect()
    }
}

impl FromIterator<u64> for RowSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> RowSet {
        RowSet::new(iter.into_iter().collect())
    }
}

/// Stack per-row \[channel\]\[polarisation\] cells into a single
/// \[pol\]\[chan\]\[row\] array. All cells must have the same shape.
pub(crate) fn stack_vis_cells(
    column: &str,
    rows: &RowSet,
    cells: &[Array2<c32>],
) -> Result<Array3<c32>, StoreError> {
    let (num_chans, num_pols) = match cells.first() {
        Some(c) => c.dim(),
        None => return Ok(Array3::zeros((0, 0, 0))),
    };
    for (cell, row) in cells.iter().zip(rows.iter()) {
        if cell.dim() != (num_chans, num_pols) {
            return Err(StoreError::InconsistentCellShape {
                column: column.to_string(),
                row,
                expected: (num_chans, num_pols),
                got: cell.dim(),
            });
        }
    }

    let mut stacked = Array3::zeros((num_pols, num_chans, cells.len()));
    for (i_row, cell) in cells.iter().enumerate() {
        stacked
            .slice_mut(s![.., .., i_row])
            .assign(&cell.t());
    }
    Ok(stacked)
}
