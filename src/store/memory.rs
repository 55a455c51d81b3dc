// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory [`ColumnStore`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use indexmap::IndexMap;
use log::trace;
use marlu::c32;
use ndarray::prelude::*;
use strum::IntoEnumIterator;

use super::*;
use crate::predicate::{Clause, KeyColumn};

/// The values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum MemColumn {
    I32(Vec<i32>),
    F64(Vec<f64>),
    Str(Vec<String>),
    /// One array per row (e.g. CHAN_FREQ).
    F64Array(Vec<Vec<f64>>),
    /// One array per row (e.g. CORR_TYPE).
    I32Array(Vec<Vec<i32>>),
    /// One \[channel\]\[polarisation\] array per row (e.g. DATA).
    Complex(Vec<Array2<c32>>),
}

impl MemColumn {
    fn len(&self) -> usize {
        match self {
            MemColumn::I32(v) => v.len(),
            MemColumn::F64(v) => v.len(),
            MemColumn::Str(v) => v.len(),
            MemColumn::F64Array(v) => v.len(),
            MemColumn::I32Array(v) => v.len(),
            MemColumn::Complex(v) => v.len(),
        }
    }
}

/// A single main-table row, for building main tables by hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MainRow {
    pub antenna1: i32,
    pub antenna2: i32,
    /// casacore time \[MJD seconds\]
    pub time: f64,
    pub scan: i32,
    pub field: i32,
    pub state: i32,
    pub data_desc: i32,
}

/// A table held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemTable {
    n_rows: u64,
    columns: IndexMap<String, MemColumn>,
    /// Only populated for a main table carrying all of the key columns.
    key_index: Option<KeyIndex>,
}

impl MemTable {
    pub fn new() -> MemTable {
        MemTable::default()
    }

    pub fn with_column(mut self, name: &str, column: MemColumn) -> MemTable {
        self.columns.insert(name.to_string(), column);
        self
    }

    /// Make a main table out of rows. Visibilities can be added afterwards
    /// with [`MemTable::with_column`].
    pub fn main(rows: &[MainRow]) -> MemTable {
        let i32_col = |f: fn(&MainRow) -> i32| MemColumn::I32(rows.iter().map(f).collect());
        MemTable::new()
            .with_column(columns::ANTENNA1, i32_col(|r| r.antenna1))
            .with_column(columns::ANTENNA2, i32_col(|r| r.antenna2))
            .with_column(columns::DATA_DESC_ID, i32_col(|r| r.data_desc))
            .with_column(columns::FIELD_ID, i32_col(|r| r.field))
            .with_column(columns::STATE_ID, i32_col(|r| r.state))
            .with_column(columns::SCAN_NUMBER, i32_col(|r| r.scan))
            .with_column(
                columns::TIME,
                MemColumn::F64(rows.iter().map(|r| r.time).collect()),
            )
    }

    fn validate(&mut self, table: &str) -> Result<(), StoreError> {
        let mut n_rows = None;
        for (name, column) in &self.columns {
            let len = column.len() as u64;
            match n_rows {
                None => n_rows = Some(len),
                Some(expected) if expected != len => {
                    return Err(StoreError::ColumnLengthMismatch {
                        table: table.to_string(),
                        column: name.clone(),
                        expected,
                        got: len,
                    })
                }
                Some(_) => (),
            }
        }
        self.n_rows = n_rows.unwrap_or(0);
        Ok(())
    }
}

/// Value-to-rows lookups for each key column of a main table.
#[derive(Debug, Clone)]
struct KeyIndex {
    keys: Vec<RowKeys>,
    by_value: HashMap<KeyColumn, BTreeMap<i32, Vec<u64>>>,
}

impl KeyIndex {
    fn new(keys: Vec<RowKeys>) -> KeyIndex {
        let mut by_value: HashMap<KeyColumn, BTreeMap<i32, Vec<u64>>> = HashMap::new();
        for column in KeyColumn::iter() {
            let map = by_value.entry(column).or_default();
            for (i_row, row) in keys.iter().enumerate() {
                map.entry(row.get(column)).or_default().push(i_row as u64);
            }
        }
        KeyIndex { keys, by_value }
    }

    /// The ascending rows having any of the values in the column.
    fn rows_with(&self, column: KeyColumn, values: &[i32]) -> Vec<u64> {
        let map = &self.by_value[&column];
        let mut rows: Vec<u64> = values
            .iter()
            .filter_map(|v| map.get(v))
            .flatten()
            .copied()
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }
}

/// Intersect two ascending lists.
fn intersect(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Assembles a [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    description: String,
    tables: HashMap<String, MemTable>,
}

impl MemoryStoreBuilder {
    pub fn new(description: &str) -> MemoryStoreBuilder {
        MemoryStoreBuilder {
            description: description.to_string(),
            tables: HashMap::new(),
        }
    }

    /// Add a table. If `name` is `None`, the table is the main table.
    pub fn table(mut self, name: Option<&str>, table: MemTable) -> MemoryStoreBuilder {
        self.tables
            .insert(name.unwrap_or(columns::MAIN_TABLE).to_string(), table);
        self
    }

    pub fn build(self) -> Result<MemoryStore, StoreError> {
        let mut tables = HashMap::with_capacity(self.tables.len());
        for (name, mut table) in self.tables {
            table.validate(&name)?;
            let has_keys = KeyColumn::iter().all(|c| table.columns.contains_key(c.column_name()));
            if name == columns::MAIN_TABLE && has_keys {
                let keys = MemTableHandle {
                    name: name.clone(),
                    table: Arc::new(table.clone()),
                }
                .row_keys()?;
                trace!("Indexed {} main-table rows", keys.len());
                table.key_index = Some(KeyIndex::new(keys));
            }
            tables.insert(name, Arc::new(table));
        }
        Ok(MemoryStore {
            description: self.description,
            tables,
        })
    }
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    description: String,
    tables: HashMap<String, Arc<MemTable>>,
}

impl ColumnStore for MemoryStore {
    type Table = MemTableHandle;

    fn open(&self, subtable: Option<&str>) -> Result<MemTableHandle, StoreError> {
        let name = subtable.unwrap_or(columns::MAIN_TABLE);
        match self.tables.get(name) {
            Some(table) => Ok(MemTableHandle {
                name: name.to_string(),
                table: Arc::clone(table),
            }),
            None => Err(StoreError::NoSuchTable {
                store: self.description.clone(),
                table: name.to_string(),
            }),
        }
    }

    fn has_subtable(&self, subtable: &str) -> bool {
        self.tables.contains_key(subtable)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// An open [`MemTable`].
#[derive(Debug, Clone)]
pub struct MemTableHandle {
    name: String,
    table: Arc<MemTable>,
}

impl MemTableHandle {
    fn column(&self, column: &str) -> Result<&MemColumn, StoreError> {
        self.table
            .columns
            .get(column)
            .ok_or_else(|| StoreError::NoSuchColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    fn wrong_type(&self, column: &str, expected: &'static str) -> StoreError {
        StoreError::WrongType {
            table: self.name.clone(),
            column: column.to_string(),
            expected,
        }
    }

    fn check_row(&self, row: u64) -> Result<usize, StoreError> {
        if row < self.table.n_rows {
            Ok(row as usize)
        } else {
            Err(StoreError::RowOutOfRange {
                row,
                n_rows: self.table.n_rows,
            })
        }
    }
}

impl TableHandle for MemTableHandle {
    fn n_rows(&self) -> u64 {
        self.table.n_rows
    }

    fn has_column(&mut self, column: &str) -> Result<bool, StoreError> {
        Ok(self.table.columns.contains_key(column))
    }

    fn i32_column(&mut self, column: &str) -> Result<Vec<i32>, StoreError> {
        match self.column(column)? {
            MemColumn::I32(v) => Ok(v.clone()),
            _ => Err(self.wrong_type(column, "i32")),
        }
    }

    fn f64_column(&mut self, column: &str) -> Result<Vec<f64>, StoreError> {
        match self.column(column)? {
            MemColumn::F64(v) => Ok(v.clone()),
            _ => Err(self.wrong_type(column, "f64")),
        }
    }

    fn string_column(&mut self, column: &str) -> Result<Vec<String>, StoreError> {
        match self.column(column)? {
            MemColumn::Str(v) => Ok(v.clone()),
            _ => Err(self.wrong_type(column, "string")),
        }
    }

    fn i32_cell(&mut self, column: &str, row: u64) -> Result<i32, StoreError> {
        let row = self.check_row(row)?;
        match self.column(column)? {
            MemColumn::I32(v) => Ok(v[row]),
            _ => Err(self.wrong_type(column, "i32")),
        }
    }

    fn f64_cell_vec(&mut self, column: &str, row: u64) -> Result<Vec<f64>, StoreError> {
        let row = self.check_row(row)?;
        match self.column(column)? {
            MemColumn::F64Array(v) => Ok(v[row].clone()),
            _ => Err(self.wrong_type(column, "f64 array")),
        }
    }

    fn i32_cell_vec(&mut self, column: &str, row: u64) -> Result<Vec<i32>, StoreError> {
        let row = self.check_row(row)?;
        match self.column(column)? {
            MemColumn::I32Array(v) => Ok(v[row].clone()),
            _ => Err(self.wrong_type(column, "i32 array")),
        }
    }

    fn vis_cells(&mut self, column: &str, rows: &RowSet) -> Result<Array3<c32>, StoreError> {
        let cells = match self.column(column)? {
            MemColumn::Complex(v) => v,
            _ => return Err(self.wrong_type(column, "complex array")),
        };
        let picked = rows
            .iter()
            .map(|row| self.check_row(row).map(|i| cells[i].clone()))
            .collect::<Result<Vec<_>, _>>()?;
        stack_vis_cells(column, rows, &picked)
    }

    fn query(&mut self, predicate: &Predicate) -> Result<RowSet, StoreError> {
        let table = Arc::clone(&self.table);
        let index = match &table.key_index {
            Some(index) => index,
            None => {
                let keys = self.row_keys()?;
                return Ok(predicate.naive_filter(&keys));
            }
        };

        // Narrow the candidate rows with every clause the index can answer,
        // then check the survivors against the whole predicate.
        let mut candidates: Option<Vec<u64>> = None;
        for clause in predicate.clauses() {
            let rows = match clause {
                Clause::Equals(c, v) => index.rows_with(*c, &[*v]),
                Clause::OneOf(c, vs) => index.rows_with(*c, vs),
                Clause::Baseline { a, b } => index.rows_with(KeyColumn::Antenna1, &[*a, *b]),
                Clause::ColumnsEqual(..) | Clause::ColumnsDiffer(..) => continue,
            };
            candidates = Some(match candidates {
                None => rows,
                Some(previous) => intersect(&previous, &rows),
            });
        }

        let matches = |row: &u64| predicate.matches(&index.keys[*row as usize]);
        let rows: RowSet = match candidates {
            Some(candidates) => candidates.into_iter().filter(matches).collect(),
            None => (0..table.n_rows).filter(matches).collect(),
        };
        trace!("'{predicate}' matched {} of {} rows", rows.len(), table.n_rows);
        Ok(rows)
    }
}
