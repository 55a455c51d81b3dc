// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Queries over the maps of a built catalog.
//!
//! Queries that find nothing return empty collections (or `None`); only keys
//! that the catalog can't know about at all are errors.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use hifitime::Epoch;
use indexmap::IndexSet;

use super::{CatalogError, CorrType, SpwInfo};
use crate::{
    resolver::{NameKind, NameResolver},
    time::casacore_utc_to_epoch,
};

/// The key of an unordered antenna pair. Both `(i, j)` and `(j, i)` give the
/// same key; the text form is `antenna_<high>_antenna_<low>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AntennaPairKey {
    high: usize,
    low: usize,
}

impl AntennaPairKey {
    pub fn new(a: usize, b: usize) -> AntennaPairKey {
        AntennaPairKey {
            high: a.max(b),
            low: a.min(b),
        }
    }

    /// The antennas in ascending order.
    pub fn antennas(&self) -> (usize, usize) {
        (self.low, self.high)
    }
}

impl fmt::Display for AntennaPairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "antenna_{}_antenna_{}", self.high, self.low)
    }
}

impl FromStr for AntennaPairKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<AntennaPairKey, CatalogError> {
        let bad = || CatalogError::MissingKey {
            key: format!("antenna pair '{s}'"),
        };
        let (a, b) = s
            .strip_prefix("antenna_")
            .and_then(|rest| rest.split_once("_antenna_"))
            .ok_or_else(bad)?;
        let a: usize = a.parse().map_err(|_| bad())?;
        let b: usize = b.parse().map_err(|_| bad())?;
        Ok(AntennaPairKey::new(a, b))
    }
}

/// The derived maps of a built [`IndexCatalog`](super::IndexCatalog).
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIndex {
    pub(super) resolver: NameResolver,

    /// Unique, ascending times \[casacore UTC seconds\].
    pub(super) times_for_scan: BTreeMap<i32, Vec<f64>>,
    pub(super) unique_scans: Vec<i32>,

    pub(super) intents_for_state: BTreeMap<i32, Vec<String>>,
    /// In the order they're first seen in the STATE table.
    pub(super) unique_intents: Vec<String>,

    pub(super) states_for_scan: BTreeMap<i32, BTreeSet<i32>>,
    pub(super) fields_for_scan: BTreeMap<i32, BTreeSet<usize>>,

    pub(super) times_for_field: BTreeMap<String, Vec<f64>>,
    pub(super) times_for_antenna_pair: BTreeMap<AntennaPairKey, Vec<f64>>,

    pub(super) spw_for_data_desc: BTreeMap<usize, usize>,
    pub(super) pol_for_data_desc: BTreeMap<usize, usize>,
    pub(super) corr_types_for_pol: BTreeMap<usize, Vec<CorrType>>,

    /// Only the usable spws.
    pub(super) spws: BTreeMap<usize, SpwInfo>,
    pub(super) dropped_spws: Vec<usize>,
    /// The number of rows in the SPECTRAL_WINDOW table.
    pub(super) num_spws: usize,

    pub(super) scans_for_spw: BTreeMap<usize, BTreeSet<i32>>,
    pub(super) fields_for_spw: BTreeMap<usize, BTreeSet<usize>>,
    pub(super) intents_for_spw: BTreeMap<usize, IndexSet<String>>,
}

impl CatalogIndex {
    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    // Scans and times.

    /// Every scan number in the main table, ascending.
    pub fn unique_scans(&self) -> &[i32] {
        &self.unique_scans
    }

    /// The scan whose time span (widened by `tolerance` seconds on both
    /// sides) contains `time`. Scans are tried in ascending order and the
    /// first match wins.
    pub fn scans_for_time(&self, time: f64, tolerance: f64) -> Option<i32> {
        self.times_for_scan.iter().find_map(|(&scan, times)| {
            let first = *times.first()?;
            let last = *times.last()?;
            (first - tolerance <= time && time <= last + tolerance).then_some(scan)
        })
    }

    /// The unique, ascending times of a scan \[casacore UTC seconds\]. Empty
    /// if the scan doesn't exist.
    pub fn times_for_scan(&self, scan: i32) -> &[f64] {
        self.times_for_scan
            .get(&scan)
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    /// The union of the times of several scans, unique and ascending.
    pub fn times_for_scans(&self, scans: &[i32]) -> Vec<f64> {
        let mut times: Vec<f64> = scans
            .iter()
            .flat_map(|&s| self.times_for_scan(s).iter().copied())
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// The first and last times of a scan.
    pub fn epochs_for_scan(&self, scan: i32) -> Option<(Epoch, Epoch)> {
        match self.times_for_scan(scan) {
            [] => None,
            [first, .., last] => Some((casacore_utc_to_epoch(*first), casacore_utc_to_epoch(*last))),
            [only] => Some((casacore_utc_to_epoch(*only), casacore_utc_to_epoch(*only))),
        }
    }

    // States and intents.

    /// The intents of a state. Empty for unknown states or states without
    /// intents.
    pub fn intents_for_state(&self, state: i32) -> &[String] {
        self.intents_for_state
            .get(&state)
            .map(|i| i.as_slice())
            .unwrap_or(&[])
    }

    pub fn unique_intents(&self) -> &[String] {
        &self.unique_intents
    }

    pub fn states_for_scan(&self, scan: i32) -> Vec<i32> {
        self.states_for_scan
            .get(&scan)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Scans containing rows with this state, ascending.
    pub fn scans_for_state(&self, state: i32) -> Vec<i32> {
        self.states_for_scan
            .iter()
            .filter(|(_, states)| states.contains(&state))
            .map(|(&scan, _)| scan)
            .collect()
    }

    /// The intents of every state in a scan, in first-seen order.
    pub fn intents_for_scan(&self, scan: i32) -> Vec<String> {
        let intents: IndexSet<&String> = self
            .states_for_scan
            .get(&scan)
            .into_iter()
            .flatten()
            .flat_map(|&state| self.intents_for_state(state))
            .collect();
        intents.into_iter().cloned().collect()
    }

    /// Scans with at least one state carrying this intent, ascending.
    pub fn scans_for_intent(&self, intent: &str) -> Vec<i32> {
        self.states_for_scan
            .iter()
            .filter(|(_, states)| {
                states
                    .iter()
                    .any(|&s| self.intents_for_state(s).iter().any(|i| i == intent))
            })
            .map(|(&scan, _)| scan)
            .collect()
    }

    // Fields.

    pub fn fields_for_scan(&self, scan: i32) -> Vec<usize> {
        self.fields_for_scan
            .get(&scan)
            .map(|f| f.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The names of the fields in a scan, in field-ID order. Names of fields
    /// sharing a name are only listed once.
    pub fn field_names_for_scan(&self, scan: i32) -> Result<Vec<String>, CatalogError> {
        let mut names: IndexSet<String> = IndexSet::new();
        for field in self.fields_for_scan(scan) {
            names.insert(
                self.resolver
                    .name_for_id(NameKind::Field, field as i64)?
                    .to_string(),
            );
        }
        Ok(names.into_iter().collect())
    }

    /// Scans that observed this field ID, ascending.
    pub fn scans_for_field(&self, field: usize) -> Vec<i32> {
        self.fields_for_scan
            .iter()
            .filter(|(_, fields)| fields.contains(&field))
            .map(|(&scan, _)| scan)
            .collect()
    }

    /// Scans that observed any field with this name, ascending.
    pub fn scans_for_field_name(&self, name: &str) -> Vec<i32> {
        let ids = self.resolver.field_ids(name);
        self.fields_for_scan
            .iter()
            .filter(|(_, fields)| ids.iter().any(|id| fields.contains(id)))
            .map(|(&scan, _)| scan)
            .collect()
    }

    /// The unique, ascending times at which any field with this name was
    /// observed.
    pub fn times_for_field(&self, name: &str) -> &[f64] {
        self.times_for_field
            .get(name)
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    // Antennas.

    /// The unique, ascending times of the baseline between two antennas.
    /// The order of the antennas doesn't matter.
    pub fn times_for_antenna_pair(&self, a: usize, b: usize) -> Result<&[f64], CatalogError> {
        for ant in [a, b] {
            if !self.resolver.contains_id(NameKind::Antenna, ant) {
                return Err(CatalogError::MissingKey {
                    key: format!("antenna {ant}"),
                });
            }
        }
        Ok(self.times_for_pair_key(&AntennaPairKey::new(a, b)))
    }

    /// Like [`CatalogIndex::times_for_antenna_pair`], but with a textual key
    /// like `antenna_3_antenna_1`.
    pub fn times_for_antenna_pair_key(&self, key: &str) -> Result<&[f64], CatalogError> {
        let key: AntennaPairKey = key.parse()?;
        let (low, high) = key.antennas();
        self.times_for_antenna_pair(low, high)
    }

    fn times_for_pair_key(&self, key: &AntennaPairKey) -> &[f64] {
        self.times_for_antenna_pair
            .get(key)
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    /// Every antenna pair that has data.
    pub fn antenna_pairs(&self) -> impl Iterator<Item = AntennaPairKey> + '_ {
        self.times_for_antenna_pair.keys().copied()
    }

    pub fn num_antennas(&self) -> usize {
        self.resolver.num_antennas()
    }

    pub fn antenna_names(&self) -> &[String] {
        self.resolver.antenna_names()
    }

    pub fn field_names(&self) -> &[String] {
        self.resolver.field_names()
    }

    // Spectral windows.

    fn check_spw(&self, spw: usize) -> Result<(), CatalogError> {
        if spw < self.num_spws {
            Ok(())
        } else {
            Err(CatalogError::MissingKey {
                key: format!("spectral window {spw}"),
            })
        }
    }

    /// The usable spws, ascending.
    pub fn usable_spws(&self) -> Vec<usize> {
        self.spws.keys().copied().collect()
    }

    /// Spws that were left out of the catalog because they're auxiliary
    /// windows.
    pub fn dropped_spws(&self) -> &[usize] {
        &self.dropped_spws
    }

    /// The frequency setup of a usable spw. `None` if the spw was dropped.
    pub fn spw_info(&self, spw: usize) -> Result<Option<&SpwInfo>, CatalogError> {
        self.check_spw(spw)?;
        Ok(self.spws.get(&spw))
    }

    /// \[Hz\]
    pub fn mean_freq_for_spw(&self, spw: usize) -> Result<Option<f64>, CatalogError> {
        Ok(self.spw_info(spw)?.map(|s| s.mean_freq))
    }

    pub fn num_chans_for_spw(&self, spw: usize) -> Result<Option<usize>, CatalogError> {
        Ok(self.spw_info(spw)?.map(|s| s.num_chans))
    }

    pub fn spw_for_data_desc(&self, data_desc: usize) -> Option<usize> {
        self.spw_for_data_desc.get(&data_desc).copied()
    }

    /// Every data description pointing at this spw, ascending. Empty if the
    /// spw has no data descriptions (or was dropped).
    pub fn data_descs_for_spw(&self, spw: usize) -> Vec<usize> {
        if !self.spws.contains_key(&spw) {
            return vec![];
        }
        self.spw_for_data_desc
            .iter()
            .filter(|(_, &s)| s == spw)
            .map(|(&dd, _)| dd)
            .collect()
    }

    /// The correlation products of the first data description pointing at
    /// this spw. Empty if there's no polarisation information.
    pub fn polarizations_for_spw(&self, spw: usize) -> &[CorrType] {
        self.data_descs_for_spw(spw)
            .first()
            .and_then(|dd| self.pol_for_data_desc.get(dd))
            .and_then(|pol| self.corr_types_for_pol.get(pol))
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn scans_for_spw(&self, spw: usize) -> Vec<i32> {
        self.scans_for_spw
            .get(&spw)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn spws_for_scan(&self, scan: i32) -> Vec<usize> {
        self.scans_for_spw
            .iter()
            .filter(|(_, scans)| scans.contains(&scan))
            .map(|(&spw, _)| spw)
            .collect()
    }

    pub fn fields_for_spw(&self, spw: usize) -> Vec<usize> {
        self.fields_for_spw
            .get(&spw)
            .map(|f| f.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn spws_for_field(&self, field: usize) -> Vec<usize> {
        self.fields_for_spw
            .iter()
            .filter(|(_, fields)| fields.contains(&field))
            .map(|(&spw, _)| spw)
            .collect()
    }

    pub fn intents_for_spw(&self, spw: usize) -> Vec<String> {
        self.intents_for_spw
            .get(&spw)
            .map(|i| i.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn spws_for_intent(&self, intent: &str) -> Vec<usize> {
        self.intents_for_spw
            .iter()
            .filter(|(_, intents)| intents.contains(intent))
            .map(|(&spw, _)| spw)
            .collect()
    }
}
