// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read CASA measurement sets.
//!
//! More info: https://casa.nrao.edu/Memos/229.html#SECTION00060000000000000000

use std::path::{Path, PathBuf};

use log::{debug, trace};
use marlu::{c32, rubbl_casatables};
use ndarray::prelude::*;
use rubbl_casatables::{Table, TableOpenMode};

use super::*;

/// A measurement set on disk.
#[derive(Debug, Clone)]
pub struct MsStore {
    /// The path to the measurement set on disk.
    ms: PathBuf,
}

impl MsStore {
    pub fn new<P: AsRef<Path>>(ms: P) -> Result<MsStore, StoreError> {
        let ms = ms.as_ref();
        debug!("Using measurement set: {}", ms.display());
        if !ms.exists() {
            return Err(StoreError::BadFile(ms.to_path_buf()));
        }
        Ok(MsStore {
            ms: ms.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.ms
    }
}

impl ColumnStore for MsStore {
    type Table = MsTable;

    /// Open a measurement set table read only. If `subtable` is `None`, then
    /// open the base table.
    fn open(&self, subtable: Option<&str>) -> Result<MsTable, StoreError> {
        if let Some(name) = subtable {
            if !self.has_subtable(name) {
                return Err(StoreError::NoSuchTable {
                    store: self.description(),
                    table: name.to_string(),
                });
            }
        }
        let table = Table::open(
            format!("{}/{}", self.ms.display(), subtable.unwrap_or("")),
            TableOpenMode::Read,
        )?;
        Ok(MsTable {
            name: subtable.unwrap_or(columns::MAIN_TABLE).to_string(),
            table,
        })
    }

    fn has_subtable(&self, subtable: &str) -> bool {
        self.ms.join(subtable).exists()
    }

    fn description(&self) -> String {
        self.ms.display().to_string()
    }
}

/// An open measurement set table.
pub struct MsTable {
    name: String,
    table: Table,
}

impl MsTable {
    fn require_column(&mut self, column: &str) -> Result<(), StoreError> {
        if self.has_column(column)? {
            Ok(())
        } else {
            Err(StoreError::NoSuchColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
        }
    }
}

impl TableHandle for MsTable {
    fn n_rows(&self) -> u64 {
        self.table.n_rows()
    }

    fn has_column(&mut self, column: &str) -> Result<bool, StoreError> {
        let col_names = self.table.column_names()?;
        Ok(col_names.iter().any(|c| c == column))
    }

    fn i32_column(&mut self, column: &str) -> Result<Vec<i32>, StoreError> {
        self.require_column(column)?;
        Ok(self.table.get_col_as_vec(column)?)
    }

    fn f64_column(&mut self, column: &str) -> Result<Vec<f64>, StoreError> {
        self.require_column(column)?;
        Ok(self.table.get_col_as_vec(column)?)
    }

    fn string_column(&mut self, column: &str) -> Result<Vec<String>, StoreError> {
        self.require_column(column)?;
        Ok(self.table.get_col_as_vec(column)?)
    }

    fn i32_cell(&mut self, column: &str, row: u64) -> Result<i32, StoreError> {
        self.require_column(column)?;
        Ok(self.table.get_cell(column, row)?)
    }

    fn f64_cell_vec(&mut self, column: &str, row: u64) -> Result<Vec<f64>, StoreError> {
        self.require_column(column)?;
        Ok(self.table.get_cell_as_vec(column, row)?)
    }

    fn i32_cell_vec(&mut self, column: &str, row: u64) -> Result<Vec<i32>, StoreError> {
        self.require_column(column)?;
        Ok(self.table.get_cell_as_vec(column, row)?)
    }

    fn vis_cells(&mut self, column: &str, rows: &RowSet) -> Result<Array3<c32>, StoreError> {
        self.require_column(column)?;
        let n_rows = self.table.n_rows();
        if let Some(row) = rows.iter().find(|&r| r >= n_rows) {
            return Err(StoreError::RowOutOfRange { row, n_rows });
        }

        let mut cells: Vec<Array2<c32>> = Vec::with_capacity(rows.len());
        for run in rows.runs() {
            trace!("Reading {column} rows {run:?}");
            self.table.for_each_row_in_range(run, |row| {
                // The data array is arranged [frequency][instrumental_pol].
                let cell: Array2<c32> = row.get_cell(column)?;
                cells.push(cell);
                Ok(())
            })?;
        }
        stack_vis_cells(column, rows, &cells)
    }

    fn query(&mut self, predicate: &Predicate) -> Result<RowSet, StoreError> {
        // casacore's TaQL isn't available through this interface; read the key
        // columns and filter here.
        let keys = self.row_keys()?;
        let rows = predicate.naive_filter(&keys);
        trace!("'{predicate}' matched {} of {} rows", rows.len(), keys.len());
        Ok(rows)
    }
}
