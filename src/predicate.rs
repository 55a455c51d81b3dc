// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conjunctive row-selection predicates over the integer key columns of a
//! measurement set's main table.
//!
//! A [`Predicate`] is what a [`crate::selection::SelectionBuilder`] hands to a
//! [`crate::store::TableHandle::query`]. It is a plain list of [`Clause`]s that
//! must all hold for a row to be selected. Its `Display` output is a
//! TaQL-like string, which is handy for logging and is stable for identical
//! criteria.

use std::fmt;

use itertools::Itertools;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::store::{columns, RowSet};

/// The main-table columns that selection clauses can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Display, EnumIter)]
pub enum KeyColumn {
    #[strum(serialize = "ANTENNA1")]
    Antenna1,

    #[strum(serialize = "ANTENNA2")]
    Antenna2,

    #[strum(serialize = "DATA_DESC_ID")]
    DataDescId,

    #[strum(serialize = "FIELD_ID")]
    FieldId,

    #[strum(serialize = "STATE_ID")]
    StateId,

    #[strum(serialize = "SCAN_NUMBER")]
    ScanNumber,
}

impl KeyColumn {
    /// The name of this column in a measurement set.
    pub fn column_name(self) -> &'static str {
        match self {
            KeyColumn::Antenna1 => columns::ANTENNA1,
            KeyColumn::Antenna2 => columns::ANTENNA2,
            KeyColumn::DataDescId => columns::DATA_DESC_ID,
            KeyColumn::FieldId => columns::FIELD_ID,
            KeyColumn::StateId => columns::STATE_ID,
            KeyColumn::ScanNumber => columns::SCAN_NUMBER,
        }
    }
}

/// The values of the [`KeyColumn`]s for a single main-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RowKeys {
    pub antenna1: i32,
    pub antenna2: i32,
    pub data_desc_id: i32,
    pub field_id: i32,
    pub state_id: i32,
    pub scan_number: i32,
}

impl RowKeys {
    pub fn get(&self, column: KeyColumn) -> i32 {
        match column {
            KeyColumn::Antenna1 => self.antenna1,
            KeyColumn::Antenna2 => self.antenna2,
            KeyColumn::DataDescId => self.data_desc_id,
            KeyColumn::FieldId => self.field_id,
            KeyColumn::StateId => self.state_id,
            KeyColumn::ScanNumber => self.scan_number,
        }
    }
}

/// A single condition on a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    /// `column == value`
    Equals(KeyColumn, i32),

    /// `column IN [values]`. The values are kept sorted and unique. An empty
    /// list matches nothing.
    OneOf(KeyColumn, Vec<i32>),

    /// `a == b`
    ColumnsEqual(KeyColumn, KeyColumn),

    /// `a != b`
    ColumnsDiffer(KeyColumn, KeyColumn),

    /// The unordered antenna pair (a, b); rows with either antenna order match.
    Baseline { a: i32, b: i32 },
}

impl Clause {
    /// Make a [`Clause::OneOf`], sorting and de-duplicating the values. A
    /// single value collapses to [`Clause::Equals`].
    pub fn one_of<I: IntoIterator<Item = i32>>(column: KeyColumn, values: I) -> Clause {
        let values: Vec<i32> = values.into_iter().sorted().dedup().collect();
        match values.as_slice() {
            [v] => Clause::Equals(column, *v),
            _ => Clause::OneOf(column, values),
        }
    }

    pub fn matches(&self, row: &RowKeys) -> bool {
        match self {
            Clause::Equals(c, v) => row.get(*c) == *v,
            Clause::OneOf(c, vs) => vs.binary_search(&row.get(*c)).is_ok(),
            Clause::ColumnsEqual(a, b) => row.get(*a) == row.get(*b),
            Clause::ColumnsDiffer(a, b) => row.get(*a) != row.get(*b),
            Clause::Baseline { a, b } => {
                (row.antenna1 == *a && row.antenna2 == *b)
                    || (row.antenna1 == *b && row.antenna2 == *a)
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Equals(c, v) => write!(f, "{c}=={v}"),
            Clause::OneOf(c, vs) => write!(f, "{c} IN [{}]", vs.iter().join(",")),
            Clause::ColumnsEqual(a, b) => write!(f, "{a}=={b}"),
            Clause::ColumnsDiffer(a, b) => write!(f, "{a}!={b}"),
            Clause::Baseline { a, b } if a == b => write!(
                f,
                "({}=={a} && {}=={a})",
                KeyColumn::Antenna1,
                KeyColumn::Antenna2
            ),
            Clause::Baseline { a, b } => write!(
                f,
                "(({a1}=={a} && {a2}=={b}) || ({a1}=={b} && {a2}=={a}))",
                a1 = KeyColumn::Antenna1,
                a2 = KeyColumn::Antenna2,
            ),
        }
    }
}

/// A conjunction of [`Clause`]s. The empty predicate selects every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Predicate {
        Predicate::default()
    }

    /// Add a clause to this conjunction.
    pub fn and(mut self, clause: Clause) -> Predicate {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, row: &RowKeys) -> bool {
        self.clauses.iter().all(|c| c.matches(row))
    }

    /// The straightforward row filter: test every row against every clause.
    /// Stores without a better way to execute a query use this, and it is the
    /// reference that smarter query paths are checked against.
    pub fn naive_filter(&self, rows: &[RowKeys]) -> RowSet {
        rows.iter()
            .enumerate()
            .filter(|(_, keys)| self.matches(keys))
            .map(|(i, _)| i as u64)
            .collect()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            write!(f, "TRUE")
        } else {
            write!(f, "{}", self.clauses.iter().join(" && "))
        }
    }
}
