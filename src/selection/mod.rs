// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Selection criteria, and turning them into main-table predicates.
//!
//! Criteria refer to antennas and fields by name or by ID, and to spectral
//! windows by spw ID. A [`SelectionBuilder`] resolves all of these against a
//! built catalog; spws become the data descriptions that point at them.

mod error;

pub use error::SelectionError;

use std::{fmt, str::FromStr};

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    catalog::CatalogIndex,
    predicate::{Clause, KeyColumn, Predicate},
    resolver::NameKind,
};

/// All-digit text is an ID; anything else is a name.
fn parse_id(s: &str) -> Option<usize> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// An antenna, by ID or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AntennaRef {
    Id(usize),
    Name(String),
}

impl FromStr for AntennaRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<AntennaRef, Self::Err> {
        Ok(match parse_id(s) {
            Some(id) => AntennaRef::Id(id),
            None => AntennaRef::Name(s.to_string()),
        })
    }
}

impl From<usize> for AntennaRef {
    fn from(id: usize) -> AntennaRef {
        AntennaRef::Id(id)
    }
}

impl From<&str> for AntennaRef {
    fn from(name: &str) -> AntennaRef {
        AntennaRef::Name(name.to_string())
    }
}

impl fmt::Display for AntennaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AntennaRef::Id(id) => write!(f, "{id}"),
            AntennaRef::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A field, by ID or by name. A name selects every field with that name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldRef {
    Id(usize),
    Name(String),
}

impl FromStr for FieldRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<FieldRef, Self::Err> {
        Ok(match parse_id(s) {
            Some(id) => FieldRef::Id(id),
            None => FieldRef::Name(s.to_string()),
        })
    }
}

impl From<usize> for FieldRef {
    fn from(id: usize) -> FieldRef {
        FieldRef::Id(id)
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> FieldRef {
        FieldRef::Name(name.to_string())
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Id(id) => write!(f, "{id}"),
            FieldRef::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Which correlations to keep.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CorrelationClass {
    /// Autocorrelations and cross-correlations.
    #[default]
    All,

    /// Only rows where ANTENNA1 != ANTENNA2.
    Cross,

    /// Only rows where ANTENNA1 == ANTENNA2.
    Auto,
}

/// What to select from the main table. Unset criteria don't restrict
/// anything. An antenna pair and individual antennas are mutually exclusive;
/// the setters keep them that way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    pub antenna1: Option<AntennaRef>,
    pub antenna2: Option<AntennaRef>,
    /// Rows of this baseline, in either antenna order.
    pub pair: Option<(AntennaRef, AntennaRef)>,
    pub spw: Option<usize>,
    pub field: Option<FieldRef>,
    pub state: Option<i32>,
    pub scan: Option<i32>,
    pub correlation: CorrelationClass,
}

impl Criteria {
    pub fn new() -> Criteria {
        Criteria::default()
    }

    pub fn with_antenna1<A: Into<AntennaRef>>(mut self, antenna: A) -> Criteria {
        self.antenna1 = Some(antenna.into());
        self.pair = None;
        self
    }

    pub fn with_antenna2<A: Into<AntennaRef>>(mut self, antenna: A) -> Criteria {
        self.antenna2 = Some(antenna.into());
        self.pair = None;
        self
    }

    pub fn with_antenna_pair<A: Into<AntennaRef>, B: Into<AntennaRef>>(
        mut self,
        a: A,
        b: B,
    ) -> Criteria {
        self.pair = Some((a.into(), b.into()));
        self.antenna1 = None;
        self.antenna2 = None;
        self
    }

    pub fn with_spw(mut self, spw: usize) -> Criteria {
        self.spw = Some(spw);
        self
    }

    pub fn with_field<F: Into<FieldRef>>(mut self, field: F) -> Criteria {
        self.field = Some(field.into());
        self
    }

    pub fn with_state(mut self, state: i32) -> Criteria {
        self.state = Some(state);
        self
    }

    pub fn with_scan(mut self, scan: i32) -> Criteria {
        self.scan = Some(scan);
        self
    }

    pub fn with_correlation(mut self, correlation: CorrelationClass) -> Criteria {
        self.correlation = correlation;
        self
    }
}

/// Turns [`Criteria`] into a [`Predicate`] over the main table.
#[derive(Debug, Clone, Copy)]
pub struct SelectionBuilder<'a> {
    index: &'a CatalogIndex,
}

impl<'a> SelectionBuilder<'a> {
    pub fn new(index: &'a CatalogIndex) -> SelectionBuilder<'a> {
        SelectionBuilder { index }
    }

    pub fn build(&self, criteria: &Criteria) -> Result<Predicate, SelectionError> {
        let mut predicate = Predicate::new();

        if let Some(a) = &criteria.antenna1 {
            let a = self.antenna_id("antenna1", a)?;
            predicate = predicate.and(Clause::Equals(KeyColumn::Antenna1, a));
        }
        if let Some(a) = &criteria.antenna2 {
            let a = self.antenna_id("antenna2", a)?;
            predicate = predicate.and(Clause::Equals(KeyColumn::Antenna2, a));
        }
        if let Some((a, b)) = &criteria.pair {
            let a = self.antenna_id("antenna pair", a)?;
            let b = self.antenna_id("antenna pair", b)?;
            predicate = predicate.and(Clause::Baseline { a, b });
        }

        if let Some(spw) = criteria.spw {
            let data_descs = self.index.data_descs_for_spw(spw);
            if data_descs.is_empty() {
                warn!("Spectral window {spw} has no usable data descriptions; nothing will be selected");
            }
            predicate = predicate.and(Clause::one_of(
                KeyColumn::DataDescId,
                data_descs.into_iter().map(|dd| dd as i32),
            ));
        }

        if let Some(field) = &criteria.field {
            let ids = self.field_ids(field)?;
            predicate = predicate.and(Clause::one_of(KeyColumn::FieldId, ids));
        }
        if let Some(state) = criteria.state {
            predicate = predicate.and(Clause::Equals(KeyColumn::StateId, state));
        }
        if let Some(scan) = criteria.scan {
            predicate = predicate.and(Clause::Equals(KeyColumn::ScanNumber, scan));
        }

        match criteria.correlation {
            CorrelationClass::All => (),
            CorrelationClass::Cross => {
                predicate = predicate.and(Clause::ColumnsDiffer(
                    KeyColumn::Antenna1,
                    KeyColumn::Antenna2,
                ))
            }
            CorrelationClass::Auto => {
                predicate = predicate.and(Clause::ColumnsEqual(
                    KeyColumn::Antenna1,
                    KeyColumn::Antenna2,
                ))
            }
        }

        trace!("Selection: {predicate}");
        Ok(predicate)
    }

    fn antenna_id(&self, criterion: &'static str, antenna: &AntennaRef) -> Result<i32, SelectionError> {
        let resolver = self.index.resolver();
        let id = match antenna {
            AntennaRef::Id(id) => Some(*id).filter(|&id| resolver.contains_id(NameKind::Antenna, id)),
            AntennaRef::Name(name) => resolver.antenna_id(name),
        };
        id.map(|id| id as i32)
            .ok_or_else(|| SelectionError::UnresolvedName {
                criterion,
                name: antenna.to_string(),
            })
    }

    fn field_ids(&self, field: &FieldRef) -> Result<Vec<i32>, SelectionError> {
        let resolver = self.index.resolver();
        let ids: Vec<i32> = match field {
            FieldRef::Id(id) if resolver.contains_id(NameKind::Field, *id) => vec![*id as i32],
            FieldRef::Id(_) => vec![],
            FieldRef::Name(name) => resolver.field_ids(name).iter().map(|&id| id as i32).collect(),
        };
        if ids.is_empty() {
            Err(SelectionError::UnresolvedName {
                criterion: "field",
                name: field.to_string(),
            })
        } else {
            Ok(ids)
        }
    }
}
