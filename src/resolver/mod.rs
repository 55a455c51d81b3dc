// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Antenna and field names to integer identifiers, and back.


use std::collections::HashMap;

use log::warn;
use strum_macros::{Display, EnumIter, EnumString};
use vec1::Vec1;

use crate::catalog::CatalogError;

/// Returned by [`NameResolver::name_for_id`] for field IDs that are within the
/// known range but have no entry in the FIELD table.
pub const UNKNOWN_NAME: &str = "unknown";

/// The kinds of things that have names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum NameKind {
    Antenna,
    Field,
}

/// Name lookups for one dataset. Antenna names are unique; an antenna's ID is
/// its row in the ANTENNA table. Field names need not be unique (e.g. the
/// pointings of a mosaic), so a field name may map to many IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolver {
    antenna_names: Vec1<String>,
    antenna_ids: HashMap<String, usize>,

    field_names: Vec<String>,
    /// Ascending IDs for each field name.
    field_ids: HashMap<String, Vec<usize>>,
    /// The number of field IDs that may legitimately be referred to. This can
    /// exceed the number of FIELD table rows when the main table refers to
    /// fields that the FIELD table doesn't list.
    num_field_ids: usize,
}

impl NameResolver {
    pub(crate) fn new(
        antenna_names: Vec1<String>,
        field_names: Vec<String>,
        num_field_ids: usize,
    ) -> NameResolver {
        let mut antenna_ids = HashMap::with_capacity(antenna_names.len());
        for (id, name) in antenna_names.iter().enumerate() {
            // Keep the first ID if a name is repeated.
            if let Some(first) = antenna_ids.get(name) {
                warn!("Antennas {first} and {id} are both called '{name}'; the name refers to antenna {first}");
                continue;
            }
            antenna_ids.insert(name.clone(), id);
        }

        let mut field_ids: HashMap<String, Vec<usize>> = HashMap::new();
        for (id, name) in field_names.iter().enumerate() {
            field_ids.entry(name.clone()).or_default().push(id);
        }

        NameResolver {
            antenna_names,
            antenna_ids,
            num_field_ids: num_field_ids.max(field_names.len()),
            field_names,
            field_ids,
        }
    }

    /// All of the IDs with this name. Antennas have at most one.
    pub fn ids_for_name(&self, kind: NameKind, name: &str) -> Option<&[usize]> {
        match kind {
            NameKind::Antenna => self
                .antenna_ids
                .get(name)
                .map(std::slice::from_ref),
            NameKind::Field => self.field_ids.get(name).map(|ids| ids.as_slice()),
        }
    }

    /// The first ID with this name.
    pub fn id_for_name(&self, kind: NameKind, name: &str) -> Option<usize> {
        self.ids_for_name(kind, name)
            .and_then(|ids| ids.first())
            .copied()
    }

    pub fn antenna_id(&self, name: &str) -> Option<usize> {
        self.antenna_ids.get(name).copied()
    }

    /// Every field ID with this name, ascending. Empty if there are none.
    pub fn field_ids(&self, name: &str) -> &[usize] {
        self.field_ids
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// The name belonging to an ID. Field IDs without a FIELD table entry (but
    /// still within the dataset's range of field IDs) are called
    /// [`UNKNOWN_NAME`].
    pub fn name_for_id(&self, kind: NameKind, id: i64) -> Result<&str, CatalogError> {
        let out_of_range = || CatalogError::IdOutOfRange { kind, id };
        let i = usize::try_from(id).map_err(|_| out_of_range())?;
        match kind {
            NameKind::Antenna => self
                .antenna_names
                .get(i)
                .map(|s| s.as_str())
                .ok_or_else(out_of_range),
            NameKind::Field => {
                if i >= self.num_field_ids {
                    Err(out_of_range())
                } else {
                    Ok(self
                        .field_names
                        .get(i)
                        .map(|s| s.as_str())
                        .unwrap_or(UNKNOWN_NAME))
                }
            }
        }
    }

    /// Is this a legitimate ID for something of this kind?
    pub fn contains_id(&self, kind: NameKind, id: usize) -> bool {
        match kind {
            NameKind::Antenna => id < self.antenna_names.len(),
            NameKind::Field => id < self.num_field_ids,
        }
    }

    pub fn num_antennas(&self) -> usize {
        self.antenna_names.len()
    }

    pub fn antenna_names(&self) -> &[String] {
        &self.antenna_names
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }
}
