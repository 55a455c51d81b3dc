// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Metadata indexing and row selection for radio-interferometric measurement sets.

An [`IndexCatalog`] cross-references a dataset's scans, times, fields, states,
intents, antennas and spectral windows. A [`RowView`] selects main-table rows
with [`Criteria`] resolved against a catalog, and derives amplitudes, phases
and averages from the selected visibilities.
 */

pub mod catalog;
pub mod config;
mod error;
pub(crate) mod math;
pub mod predicate;
pub mod resolver;
pub mod selection;
pub mod store;
pub mod time;
pub mod view;

#[cfg(test)]
mod tests;

// Re-exports.
pub use catalog::{AntennaPairKey, CatalogError, CatalogIndex, IndexCatalog, SpwInfo};
pub use config::{CatalogConfig, ConfigError};
pub use error::MsIndexError;
pub use math::unwrap_phase;
pub use predicate::{Clause, KeyColumn, Predicate, RowKeys};
pub use resolver::{NameKind, NameResolver};
pub use selection::{AntennaRef, CorrelationClass, Criteria, FieldRef, SelectionBuilder, SelectionError};
pub use store::{ColumnStore, MemoryStore, MsStore, RowSet, StoreError, TableHandle};
pub use view::{RowView, RowViewError};

// External re-exports.
pub use hifitime;
pub use marlu::c32;
pub use ndarray;
