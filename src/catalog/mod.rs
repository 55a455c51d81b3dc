// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cross-reference indices over a dataset's metadata.
//!
//! An [`IndexCatalog`] is bound to one dataset ([`ColumnStore`]). Calling
//! [`IndexCatalog::rebuild`] reads the raw columns and derives every map in a
//! fixed order, each step only using the results of earlier steps:
//!
//! 1. scan -> times, and the unique scans;
//! 2. field names;
//! 3. state -> intents, and the unique intents;
//! 4. antenna names (and, with step 2, the [`NameResolver`]);
//! 5. scan -> states and scan -> fields;
//! 6. field name -> times;
//! 7. antenna pair -> times;
//! 8. data description -> spw (and -> polarisation setup);
//! 9. the usable spws (auxiliary windows are dropped);
//! 10. spw -> scans;
//! 11. spw -> fields;
//! 12. spw -> intents.
//!
//! Nothing is updated incrementally; a rebuild replaces everything and gives
//! the catalog a new generation number.

mod error;
mod index;
mod spw;
#[cfg(test)]
mod tests;

pub use error::CatalogError;
pub use index::{AntennaPairKey, CatalogIndex};
pub use spw::{CorrType, SpwInfo};

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use indexmap::IndexSet;
use log::{debug, trace, warn};
use vec1::Vec1;

use crate::{
    config::CatalogConfig,
    predicate::RowKeys,
    resolver::{NameKind, NameResolver},
    selection::SelectionBuilder,
    store::{columns, ColumnStore, MsStore, TableHandle},
};

/// Generations are unique across every catalog in the process, so a view
/// can't mistake one catalog's generation for another's.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Derived metadata maps over one dataset.
pub struct IndexCatalog<S: ColumnStore> {
    store: S,
    config: CatalogConfig,
    index: Option<CatalogIndex>,
    /// 0 until the catalog is first built.
    generation: u64,
}

impl IndexCatalog<MsStore> {
    /// Open a measurement set and build its catalog.
    pub fn from_ms<P: AsRef<Path>>(
        ms: P,
        config: CatalogConfig,
    ) -> Result<IndexCatalog<MsStore>, CatalogError> {
        IndexCatalog::build(MsStore::new(ms)?, config)
    }
}

impl<S: ColumnStore> IndexCatalog<S> {
    /// Bind a catalog to a dataset without building it. Queries fail until
    /// [`IndexCatalog::rebuild`] is called.
    pub fn new(store: S, config: CatalogConfig) -> IndexCatalog<S> {
        IndexCatalog {
            store,
            config,
            index: None,
            generation: 0,
        }
    }

    /// Bind a catalog to a dataset and build it.
    pub fn build(store: S, config: CatalogConfig) -> Result<IndexCatalog<S>, CatalogError> {
        let mut catalog = IndexCatalog::new(store, config);
        catalog.rebuild()?;
        Ok(catalog)
    }

    /// Re-read the dataset and recompute every map. If this fails, the
    /// catalog keeps whatever it had before.
    pub fn rebuild(&mut self) -> Result<(), CatalogError> {
        debug!("Building the index catalog for {}", self.store.description());
        self.config.validate()?;
        let index = build_index(&self.store, &self.config)?;
        self.index = Some(index);
        self.generation = next_generation();
        trace!("Catalog generation is now {}", self.generation);
        Ok(())
    }

    /// The built maps.
    pub fn index(&self) -> Result<&CatalogIndex, CatalogError> {
        self.index.as_ref().ok_or_else(|| CatalogError::NotBuilt {
            dataset: self.store.description(),
        })
    }

    pub fn resolver(&self) -> Result<&NameResolver, CatalogError> {
        Ok(self.index()?.resolver())
    }

    /// [`CatalogIndex::scans_for_time`] with the configured tolerance.
    pub fn scans_for_time_default(&self, time: f64) -> Result<Option<i32>, CatalogError> {
        Ok(self
            .index()?
            .scans_for_time(time, self.config.scan_time_tolerance))
    }

    /// Something to turn selection criteria into predicates with.
    pub fn selection_builder(&self) -> Result<SelectionBuilder<'_>, CatalogError> {
        Ok(SelectionBuilder::new(self.index()?))
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    /// Changes with every rebuild. 0 if the catalog has never been built.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

/// The raw main-table columns that the maps are derived from.
struct MainColumns {
    keys: Vec<RowKeys>,
    times: Vec<f64>,
}

fn read_main<S: ColumnStore>(store: &S) -> Result<MainColumns, CatalogError> {
    let mut main_table = store.open(None)?;
    if main_table.n_rows() == 0 {
        return Err(CatalogError::MainTableEmpty);
    }
    let keys = main_table.row_keys()?;
    let times = main_table.f64_column(columns::TIME)?;

    for k in &keys {
        for (column, value) in [
            (columns::ANTENNA1, k.antenna1),
            (columns::ANTENNA2, k.antenna2),
            (columns::FIELD_ID, k.field_id),
            (columns::DATA_DESC_ID, k.data_desc_id),
        ] {
            if value < 0 {
                return Err(CatalogError::NegativeId { column, value });
            }
        }
    }
    trace!("Read {} main-table rows", keys.len());
    Ok(MainColumns { keys, times })
}

/// Group timestamps by key, sorting them and removing duplicates.
fn group_times<K: Ord>(pairs: impl Iterator<Item = (K, f64)>) -> BTreeMap<K, Vec<f64>> {
    let mut grouped: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (k, t) in pairs {
        grouped.entry(k).or_default().push(t);
    }
    for times in grouped.values_mut() {
        times.sort_by(f64::total_cmp);
        times.dedup();
    }
    grouped
}

/// Intents are stored comma separated in one string per state.
pub(crate) fn split_intents(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn read_field_names<S: ColumnStore>(store: &S) -> Result<Vec<String>, CatalogError> {
    let mut field_table = store.open(Some(columns::FIELD_TABLE))?;
    Ok(field_table.string_column(columns::NAME)?)
}

fn read_state_intents<S: ColumnStore>(
    store: &S,
) -> Result<BTreeMap<i32, Vec<String>>, CatalogError> {
    if !store.has_subtable(columns::STATE_TABLE) {
        warn!("There is no STATE table; no observing intents are available");
        return Ok(BTreeMap::new());
    }
    let mut state_table = store.open(Some(columns::STATE_TABLE))?;
    if !state_table.has_column(columns::OBS_MODE)? {
        warn!("The STATE table has no OBS_MODE column; no observing intents are available");
        return Ok(BTreeMap::new());
    }
    let obs_modes = state_table.string_column(columns::OBS_MODE)?;
    Ok(obs_modes
        .iter()
        .enumerate()
        .map(|(state, raw)| (state as i32, split_intents(raw)))
        .collect())
}

fn read_antenna_names<S: ColumnStore>(store: &S) -> Result<Vec1<String>, CatalogError> {
    let mut antenna_table = store.open(Some(columns::ANTENNA_TABLE))?;
    let names: Vec<String> = antenna_table.string_column(columns::NAME)?;
    trace!("There are {} antenna names", names.len());
    Vec1::try_from_vec(names).map_err(|_| CatalogError::AntennaTableEmpty)
}

/// Data description -> spw, and data description -> polarisation setup.
type DataDescMaps = (BTreeMap<usize, usize>, BTreeMap<usize, usize>);

fn read_data_descriptions<S: ColumnStore>(store: &S) -> Result<DataDescMaps, CatalogError> {
    let mut dd_table = store.open(Some(columns::DATA_DESCRIPTION_TABLE))?;
    let to_ids = |column: &'static str, values: Vec<i32>| {
        values
            .into_iter()
            .enumerate()
            .map(|(dd, v)| {
                usize::try_from(v)
                    .map(|v| (dd, v))
                    .map_err(|_| CatalogError::NegativeId { column, value: v })
            })
            .collect::<Result<BTreeMap<usize, usize>, _>>()
    };

    let spws = to_ids(
        columns::SPECTRAL_WINDOW_ID,
        dd_table.i32_column(columns::SPECTRAL_WINDOW_ID)?,
    )?;
    let pols = if dd_table.has_column(columns::POLARIZATION_ID)? {
        to_ids(
            columns::POLARIZATION_ID,
            dd_table.i32_column(columns::POLARIZATION_ID)?,
        )?
    } else {
        BTreeMap::new()
    };
    Ok((spws, pols))
}

fn read_corr_types<S: ColumnStore>(
    store: &S,
) -> Result<BTreeMap<usize, Vec<CorrType>>, CatalogError> {
    if !store.has_subtable(columns::POLARIZATION_TABLE) {
        debug!("There is no POLARIZATION table");
        return Ok(BTreeMap::new());
    }
    let mut pol_table = store.open(Some(columns::POLARIZATION_TABLE))?;
    if !pol_table.has_column(columns::CORR_TYPE)? {
        return Ok(BTreeMap::new());
    }
    let mut corr_types = BTreeMap::new();
    for pol in 0..pol_table.n_rows() {
        let types: Vec<i32> = pol_table.i32_cell_vec(columns::CORR_TYPE, pol)?;
        corr_types.insert(
            pol as usize,
            types.into_iter().map(CorrType::from).collect(),
        );
    }
    Ok(corr_types)
}

/// The usable spws, the IDs of the dropped ones, and the total number of
/// spws in the table.
type SpwCatalog = (BTreeMap<usize, SpwInfo>, Vec<usize>, usize);

fn read_spws<S: ColumnStore>(store: &S, config: &CatalogConfig) -> Result<SpwCatalog, CatalogError> {
    let mut spw_table = store.open(Some(columns::SPECTRAL_WINDOW_TABLE))?;
    let num_chans = spw_table.i32_column(columns::NUM_CHAN)?;
    let has_widths = spw_table.has_column(columns::CHAN_WIDTH)?;
    let bandwidths = if spw_table.has_column(columns::TOTAL_BANDWIDTH)? {
        Some(spw_table.f64_column(columns::TOTAL_BANDWIDTH)?)
    } else {
        None
    };
    let sidebands = if spw_table.has_column(columns::NET_SIDEBAND)? {
        Some(spw_table.i32_column(columns::NET_SIDEBAND)?)
    } else {
        None
    };
    let ref_freqs = if spw_table.has_column(columns::REF_FREQUENCY)? {
        Some(spw_table.f64_column(columns::REF_FREQUENCY)?)
    } else {
        None
    };
    let names = if spw_table.has_column(columns::NAME)? {
        Some(spw_table.string_column(columns::NAME)?)
    } else {
        None
    };

    let mut usable = BTreeMap::new();
    let mut dropped = vec![];
    for (spw, &n) in num_chans.iter().enumerate() {
        let n = usize::try_from(n).map_err(|_| CatalogError::NegativeId {
            column: columns::NUM_CHAN,
            value: n,
        })?;
        if config.drops_spw_with(n) {
            dropped.push(spw);
            continue;
        }

        let chan_freqs = spw_table.f64_cell_vec(columns::CHAN_FREQ, spw as u64)?;
        if chan_freqs.len() != n {
            return Err(CatalogError::ChanFreqMismatch {
                spw,
                num_chans: n,
                num_freqs: chan_freqs.len(),
            });
        }
        let chan_widths = if has_widths {
            spw_table.f64_cell_vec(columns::CHAN_WIDTH, spw as u64)?
        } else {
            vec![]
        };
        let total_bandwidth = match &bandwidths {
            Some(b) => b[spw],
            None => chan_widths.iter().map(|w| w.abs()).sum(),
        };
        usable.insert(
            spw,
            SpwInfo {
                id: spw,
                name: names.as_ref().map(|n| n[spw].clone()),
                num_chans: n,
                mean_freq: SpwInfo::mean(&chan_freqs),
                chan_freqs,
                chan_widths,
                total_bandwidth,
                net_sideband: sidebands.as_ref().map(|s| s[spw]).unwrap_or(1),
                ref_freq: ref_freqs.as_ref().map(|r| r[spw]),
            },
        );
    }
    Ok((usable, dropped, num_chans.len()))
}

fn build_index<S: ColumnStore>(
    store: &S,
    config: &CatalogConfig,
) -> Result<CatalogIndex, CatalogError> {
    let main = read_main(store)?;

    // 1. Scans and their times.
    let times_for_scan = group_times(
        main.keys
            .iter()
            .zip(main.times.iter())
            .map(|(k, &t)| (k.scan_number, t)),
    );
    let unique_scans: Vec<i32> = times_for_scan.keys().copied().collect();
    debug!("Unique scans: {unique_scans:?}");

    // 2. Fields.
    let field_names = read_field_names(store)?;
    trace!("There are {} field names", field_names.len());

    // 3. States and intents. Plenty of telescopes don't record intents.
    let intents_for_state = read_state_intents(store)?;
    let unique_intents: IndexSet<String> = intents_for_state.values().flatten().cloned().collect();
    if unique_intents.is_empty() {
        debug!("No observing intents are recorded");
    } else {
        debug!("Observing intents: {unique_intents:?}");
    }

    // 4. Antennas. The name lookups are ready after this.
    let antenna_names = read_antenna_names(store)?;
    for k in &main.keys {
        for a in [k.antenna1, k.antenna2] {
            if a as usize >= antenna_names.len() {
                return Err(CatalogError::AntennaNumTooBig(a));
            }
        }
    }
    let num_field_ids = main
        .keys
        .iter()
        .map(|k| k.field_id as usize + 1)
        .max()
        .unwrap_or(0);
    let resolver = NameResolver::new(antenna_names, field_names, num_field_ids);

    // 5. What each scan contains.
    let mut states_for_scan: BTreeMap<i32, BTreeSet<i32>> = BTreeMap::new();
    let mut fields_for_scan: BTreeMap<i32, BTreeSet<usize>> = BTreeMap::new();
    for k in &main.keys {
        states_for_scan
            .entry(k.scan_number)
            .or_default()
            .insert(k.state_id);
        fields_for_scan
            .entry(k.scan_number)
            .or_default()
            .insert(k.field_id as usize);
    }

    // 6. Field times, grouped by name.
    let field_names_per_row = main
        .keys
        .iter()
        .map(|k| {
            resolver
                .name_for_id(NameKind::Field, i64::from(k.field_id))
                .map(String::from)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let times_for_field = group_times(field_names_per_row.into_iter().zip(main.times.iter().copied()));

    // 7. Antenna-pair times.
    let times_for_antenna_pair = group_times(main.keys.iter().zip(main.times.iter()).map(|(k, &t)| {
        (
            AntennaPairKey::new(k.antenna1 as usize, k.antenna2 as usize),
            t,
        )
    }));

    // 8. Data descriptions.
    let (spw_for_data_desc, pol_for_data_desc) = read_data_descriptions(store)?;
    let corr_types_for_pol = read_corr_types(store)?;

    // 9. Usable spws.
    let (spws, dropped_spws, num_spws) = read_spws(store, config)?;
    if !dropped_spws.is_empty() {
        debug!(
            "Dropped spws with {} channels: {dropped_spws:?}",
            config.auxiliary_num_chans
        );
    }
    debug!("Usable spws: {:?}", spws.keys().collect::<Vec<_>>());

    // The usable spw of each row, if it has one.
    let row_spws: Vec<Option<usize>> = main
        .keys
        .iter()
        .map(|k| {
            spw_for_data_desc
                .get(&(k.data_desc_id as usize))
                .copied()
                .filter(|spw| spws.contains_key(spw))
        })
        .collect();

    // 10. spw -> scans.
    let mut scans_for_spw: BTreeMap<usize, BTreeSet<i32>> = BTreeMap::new();
    for (k, spw) in main.keys.iter().zip(row_spws.iter()) {
        if let Some(spw) = spw {
            scans_for_spw.entry(*spw).or_default().insert(k.scan_number);
        }
    }

    // 11. spw -> fields.
    let mut fields_for_spw: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for (k, spw) in main.keys.iter().zip(row_spws.iter()) {
        if let Some(spw) = spw {
            fields_for_spw
                .entry(*spw)
                .or_default()
                .insert(k.field_id as usize);
        }
    }

    // 12. spw -> intents, via the states seen with each spw.
    let mut states_for_spw: BTreeMap<usize, BTreeSet<i32>> = BTreeMap::new();
    for (k, spw) in main.keys.iter().zip(row_spws.iter()) {
        if let Some(spw) = spw {
            states_for_spw.entry(*spw).or_default().insert(k.state_id);
        }
    }
    let intents_for_spw: BTreeMap<usize, IndexSet<String>> = states_for_spw
        .into_iter()
        .map(|(spw, states)| {
            let intents = states
                .iter()
                .filter_map(|s| intents_for_state.get(s))
                .flatten()
                .cloned()
                .collect();
            (spw, intents)
        })
        .collect();

    Ok(CatalogIndex {
        resolver,
        times_for_scan,
        unique_scans,
        intents_for_state,
        unique_intents: unique_intents.into_iter().collect(),
        states_for_scan,
        fields_for_scan,
        times_for_field,
        times_for_antenna_pair,
        spw_for_data_desc,
        pol_for_data_desc,
        corr_types_for_pol,
        spws,
        dropped_spws,
        num_spws,
        scans_for_spw,
        fields_for_spw,
        intents_for_spw,
    })
}
