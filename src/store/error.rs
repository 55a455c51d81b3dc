// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading columnar tables.

use std::path::PathBuf;

use marlu::rubbl_casatables;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Supplied file path {0} does not exist or is not readable!")]
    BadFile(PathBuf),

    #[error("The table '{table}' does not exist in {store}")]
    NoSuchTable { store: String, table: String },

    #[error("The table '{table}' has no column named '{column}'")]
    NoSuchColumn { table: String, column: String },

    #[error("Column '{column}' of table '{table}' does not hold {expected} values")]
    WrongType {
        table: String,
        column: String,
        expected: &'static str,
    },

    #[error("Column '{column}' of table '{table}' has {got} rows, but the table has {expected}")]
    ColumnLengthMismatch {
        table: String,
        column: String,
        expected: u64,
        got: u64,
    },

    #[error("Row {row} was requested, but the table only has {n_rows} rows")]
    RowOutOfRange { row: u64, n_rows: u64 },

    #[error("Column '{column}' row {row} has shape {got:?}, but earlier rows had shape {expected:?}")]
    InconsistentCellShape {
        column: String,
        row: u64,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Error when trying to interface with measurement set: {0}")]
    Table(#[from] rubbl_casatables::TableError),

    #[error("Error from casacore: {0}")]
    Casacore(#[from] rubbl_casatables::CasacoreError),
}
