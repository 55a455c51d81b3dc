// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filtered views of the main table.
//!
//! A [`RowView`] is either stale or materialised. Changing any selection
//! criterion makes it stale; materialising runs the selection against the
//! dataset and caches the selected rows, their times and antennas.
//! Visibilities are read when first asked for, as are the amplitudes, phases
//! and averages derived from them; all are thrown away with the rest of the
//! cache. Only the visibility accessors care whether the selected rows have
//! the same number of channels.
//!
//! Criteria that can't be resolved against the catalog are rejected, and the
//! view keeps its previous criteria.
//!
//! By default a view re-materialises as soon as it goes stale. Turn this off
//! to change several criteria at once without re-reading the data each time.

mod error;

pub use error::RowViewError;

use std::cell::OnceCell;

use log::{debug, trace};
use marlu::c32;
use ndarray::prelude::*;

use crate::{
    catalog::IndexCatalog,
    math::unwrap_phase,
    predicate::Predicate,
    selection::{AntennaRef, CorrelationClass, Criteria, FieldRef, SelectionBuilder},
    store::{columns, ColumnStore, RowSet, StoreError, TableHandle},
};

/// Everything read and derived for one selection.
struct Materialized {
    /// The catalog generation the selection was resolved against.
    generation: u64,
    predicate: Predicate,
    rows: RowSet,
    times: Vec<f64>,
    antenna1: Vec<i32>,
    antenna2: Vec<i32>,
    /// \[pol\]\[chan\]\[row\]
    data: OnceCell<Array3<c32>>,

    amplitude: OnceCell<Array3<f32>>,
    phase: OnceCell<Array3<f32>>,
    unwrapped_phase: OnceCell<Array3<f32>>,
    time_averaged: OnceCell<Array2<c32>>,
    freq_averaged: OnceCell<Array2<c32>>,
}

/// A selection of main-table rows and the data derived from them.
pub struct RowView<'a, S: ColumnStore> {
    catalog: &'a IndexCatalog<S>,
    criteria: Criteria,
    data_column: String,
    auto_materialize: bool,
    /// `None` while stale.
    materialized: Option<Materialized>,
}

impl<'a, S: ColumnStore> RowView<'a, S> {
    /// Create a view over a catalog's dataset. The data column and whether to
    /// materialise automatically come from the catalog's config; if the
    /// latter is set, the view is materialised straight away.
    pub fn new(
        catalog: &'a IndexCatalog<S>,
        criteria: Criteria,
    ) -> Result<RowView<'a, S>, RowViewError> {
        let mut view = RowView {
            catalog,
            criteria,
            data_column: catalog.config().data_column.clone(),
            auto_materialize: catalog.config().auto_materialize,
            materialized: None,
        };
        if view.auto_materialize {
            view.materialize()?;
        }
        Ok(view)
    }

    /// Change whether the view materialises itself after every change. If
    /// this turns it on, a stale view is materialised now.
    pub fn with_auto_materialize(mut self, on: bool) -> Result<RowView<'a, S>, RowViewError> {
        self.set_auto_materialize(on)?;
        Ok(self)
    }

    pub fn set_auto_materialize(&mut self, on: bool) -> Result<(), RowViewError> {
        self.auto_materialize = on;
        if on {
            self.materialize()?;
        }
        Ok(())
    }

    pub fn auto_materialize(&self) -> bool {
        self.auto_materialize
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn data_column(&self) -> &str {
        &self.data_column
    }

    pub fn catalog(&self) -> &'a IndexCatalog<S> {
        self.catalog
    }

    /// Is the cache current? A view goes stale when its criteria change or
    /// when it is pointed at a different catalog (generation).
    pub fn is_materialized(&self) -> bool {
        self.current().is_ok()
    }

    fn current(&self) -> Result<&Materialized, RowViewError> {
        match &self.materialized {
            Some(m) if m.generation == self.catalog.generation() => Ok(m),
            _ => Err(RowViewError::NotMaterialized),
        }
    }

    /// Bring the view up to date. Does nothing if it already is.
    pub fn materialize(&mut self) -> Result<(), RowViewError> {
        if self.is_materialized() {
            trace!("Row view is already materialised");
            return Ok(());
        }
        self.materialized = None;

        let predicate = SelectionBuilder::new(self.catalog.index()?).build(&self.criteria)?;
        let mut main_table = self.catalog.store().open(None)?;
        let rows = main_table.query(&predicate)?;
        debug!("'{predicate}' selected {} rows", rows.len());

        let times = main_table.f64_column_for(columns::TIME, &rows)?;
        let antenna1 = main_table.i32_column_for(columns::ANTENNA1, &rows)?;
        let antenna2 = main_table.i32_column_for(columns::ANTENNA2, &rows)?;

        self.materialized = Some(Materialized {
            generation: self.catalog.generation(),
            predicate,
            rows,
            times,
            antenna1,
            antenna2,
            data: OnceCell::new(),
            amplitude: OnceCell::new(),
            phase: OnceCell::new(),
            unwrapped_phase: OnceCell::new(),
            time_averaged: OnceCell::new(),
            freq_averaged: OnceCell::new(),
        });
        Ok(())
    }

    /// Go stale, and re-materialise if that's wanted.
    fn invalidate(&mut self) -> Result<(), RowViewError> {
        self.materialized = None;
        if self.auto_materialize {
            self.materialize()
        } else {
            Ok(())
        }
    }

    /// Apply a change to the criteria. A change that doesn't change anything
    /// keeps the view as it is.
    fn update<F: FnOnce(Criteria) -> Criteria>(&mut self, change: F) -> Result<(), RowViewError> {
        let criteria = change(self.criteria.clone());
        if criteria == self.criteria {
            trace!("Row view criteria are unchanged");
            return Ok(());
        }
        // Criteria that don't resolve are never committed.
        SelectionBuilder::new(self.catalog.index()?).build(&criteria)?;
        self.criteria = criteria;
        self.invalidate()
    }

    // Criteria.

    pub fn set_criteria(&mut self, criteria: Criteria) -> Result<(), RowViewError> {
        self.update(|_| criteria)
    }

    pub fn set_antenna1<A: Into<AntennaRef>>(&mut self, antenna: A) -> Result<(), RowViewError> {
        self.update(|c| c.with_antenna1(antenna))
    }

    pub fn set_antenna2<A: Into<AntennaRef>>(&mut self, antenna: A) -> Result<(), RowViewError> {
        self.update(|c| c.with_antenna2(antenna))
    }

    /// Select a baseline, in either antenna order. This replaces any
    /// individual antenna criteria.
    pub fn set_antenna_pair<A: Into<AntennaRef>, B: Into<AntennaRef>>(
        &mut self,
        a: A,
        b: B,
    ) -> Result<(), RowViewError> {
        self.update(|c| c.with_antenna_pair(a, b))
    }

    /// Remove all antenna criteria.
    pub fn clear_antennas(&mut self) -> Result<(), RowViewError> {
        self.update(|c| Criteria {
            antenna1: None,
            antenna2: None,
            pair: None,
            ..c
        })
    }

    pub fn set_spw(&mut self, spw: usize) -> Result<(), RowViewError> {
        self.update(|c| c.with_spw(spw))
    }

    pub fn clear_spw(&mut self) -> Result<(), RowViewError> {
        self.update(|c| Criteria { spw: None, ..c })
    }

    pub fn set_field<F: Into<FieldRef>>(&mut self, field: F) -> Result<(), RowViewError> {
        self.update(|c| c.with_field(field))
    }

    pub fn clear_field(&mut self) -> Result<(), RowViewError> {
        self.update(|c| Criteria { field: None, ..c })
    }

    pub fn set_state(&mut self, state: i32) -> Result<(), RowViewError> {
        self.update(|c| c.with_state(state))
    }

    pub fn clear_state(&mut self) -> Result<(), RowViewError> {
        self.update(|c| Criteria { state: None, ..c })
    }

    pub fn set_scan(&mut self, scan: i32) -> Result<(), RowViewError> {
        self.update(|c| c.with_scan(scan))
    }

    pub fn clear_scan(&mut self) -> Result<(), RowViewError> {
        self.update(|c| Criteria { scan: None, ..c })
    }

    pub fn set_correlation(&mut self, correlation: CorrelationClass) -> Result<(), RowViewError> {
        self.update(|c| c.with_correlation(correlation))
    }

    /// Read visibilities from another column (e.g. CORRECTED_DATA). The
    /// column must exist.
    pub fn set_data_column(&mut self, column: &str) -> Result<(), RowViewError> {
        if self.data_column == column {
            return Ok(());
        }
        let mut main_table = self.catalog.store().open(None)?;
        if !main_table.has_column(column)? {
            return Err(StoreError::NoSuchColumn {
                table: columns::MAIN_TABLE.to_string(),
                column: column.to_string(),
            }
            .into());
        }
        self.data_column = column.to_string();
        self.invalidate()
    }

    /// Point the view at another catalog (e.g. of another dataset). The view
    /// always goes stale, even if the catalog is the same.
    pub fn set_catalog(&mut self, catalog: &'a IndexCatalog<S>) -> Result<(), RowViewError> {
        self.catalog = catalog;
        self.invalidate()
    }

    // Materialised data.

    pub fn predicate(&self) -> Result<&Predicate, RowViewError> {
        Ok(&self.current()?.predicate)
    }

    pub fn rows(&self) -> Result<&RowSet, RowViewError> {
        Ok(&self.current()?.rows)
    }

    /// \[casacore UTC seconds\]
    pub fn times(&self) -> Result<&[f64], RowViewError> {
        Ok(&self.current()?.times)
    }

    pub fn antenna1(&self) -> Result<&[i32], RowViewError> {
        Ok(&self.current()?.antenna1)
    }

    pub fn antenna2(&self) -> Result<&[i32], RowViewError> {
        Ok(&self.current()?.antenna2)
    }

    /// The selected visibilities, \[pol\]\[chan\]\[row\]. These are read
    /// on the first call; all of the selected rows must have cells of the same
    /// shape.
    pub fn data(&self) -> Result<&Array3<c32>, RowViewError> {
        let m = self.current()?;
        if let Some(data) = m.data.get() {
            return Ok(data);
        }
        let mut main_table = self.catalog.store().open(None)?;
        let data = main_table.vis_cells(&self.data_column, &m.rows)?;
        trace!("Read {} data with shape {:?}", self.data_column, data.dim());
        Ok(m.data.get_or_init(|| data))
    }

    pub fn amplitude(&self) -> Result<&Array3<f32>, RowViewError> {
        let m = self.current()?;
        let data = self.data()?;
        Ok(m.amplitude.get_or_init(|| data.mapv(|v| v.norm())))
    }

    /// \[radians\]
    pub fn phase(&self) -> Result<&Array3<f32>, RowViewError> {
        let m = self.current()?;
        let data = self.data()?;
        Ok(m.phase.get_or_init(|| data.mapv(|v| v.im.atan2(v.re))))
    }

    /// [`RowView::phase`] with the 2π jumps between adjacent channels removed.
    pub fn unwrapped_phase(&self) -> Result<&Array3<f32>, RowViewError> {
        let m = self.current()?;
        let phase = self.phase()?;
        Ok(m.unwrapped_phase.get_or_init(|| {
            let mut unwrapped = phase.clone();
            for mut chans in unwrapped.lanes_mut(Axis(1)) {
                let u = unwrap_phase(&chans.to_vec());
                chans.assign(&Array1::from(u));
            }
            unwrapped
        }))
    }

    /// The mean over rows (time), \[pol\]\[chan\].
    pub fn time_averaged(&self) -> Result<&Array2<c32>, RowViewError> {
        let (m, data) = self.nonempty()?;
        Ok(m.time_averaged.get_or_init(|| mean_over(data, Axis(2))))
    }

    /// The mean over channels (frequency), \[pol\]\[row\].
    pub fn freq_averaged(&self) -> Result<&Array2<c32>, RowViewError> {
        let (m, data) = self.nonempty()?;
        Ok(m.freq_averaged.get_or_init(|| mean_over(data, Axis(1))))
    }

    fn nonempty(&self) -> Result<(&Materialized, &Array3<c32>), RowViewError> {
        let m = self.current()?;
        let data = self.data()?;
        if data.is_empty() {
            return Err(RowViewError::EmptySelection);
        }
        Ok((m, data))
    }
}

/// The arithmetic mean along an axis, which must not be empty.
fn mean_over(data: &Array3<c32>, axis: Axis) -> Array2<c32> {
    let n = data.len_of(axis) as f32;
    data.sum_axis(axis).mapv(|v| v / n)
}
