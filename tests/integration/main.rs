// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use itertools::iproduct;
use ndarray::prelude::*;

use ms_index::{
    c32,
    store::{columns, MainRow, MemColumn, MemTable, MemoryStore, MemoryStoreBuilder},
    AntennaRef, CatalogConfig, ColumnStore, CorrelationClass, Criteria, IndexCatalog, MsIndexError,
    RowView, TableHandle,
};

const T0: f64 = 4_900_000_000.0;
const NUM_CHANS: usize = 8;

/// 3 antennas, 2 scans (one field each), 1 spw, and a STATE table without
/// intents. Scan 2 stores the 0-1 baseline as 1-0.
fn dataset() -> MemoryStore {
    let mut rows = vec![];
    for (scan, field) in [(1, 0), (2, 1)] {
        for i_time in 0..2 {
            for (antenna1, antenna2) in [(0, 1), (0, 2), (1, 2)] {
                let (antenna1, antenna2) = if scan == 2 && antenna1 == 0 && antenna2 == 1 {
                    (1, 0)
                } else {
                    (antenna1, antenna2)
                };
                rows.push(MainRow {
                    antenna1,
                    antenna2,
                    time: T0 + 100.0 * (scan - 1) as f64 + 8.0 * i_time as f64,
                    scan,
                    field,
                    state: 0,
                    data_desc: 0,
                });
            }
        }
    }
    let data = (0..rows.len())
        .map(|i_row| {
            Array2::from_shape_fn((NUM_CHANS, 4), |(chan, pol)| {
                c32::new(i_row as f32, (chan * pol) as f32)
            })
        })
        .collect();

    let strings = |s: &[&str]| MemColumn::Str(s.iter().map(|s| s.to_string()).collect());
    MemoryStoreBuilder::new("integration")
        .table(
            None,
            MemTable::main(&rows).with_column(columns::DATA, MemColumn::Complex(data)),
        )
        .table(
            Some(columns::ANTENNA_TABLE),
            MemTable::new().with_column(columns::NAME, strings(&["m000", "m001", "m002"])),
        )
        .table(
            Some(columns::FIELD_TABLE),
            MemTable::new().with_column(columns::NAME, strings(&["PKS1934-638", "NGC253"])),
        )
        .table(
            Some(columns::STATE_TABLE),
            MemTable::new().with_column(columns::OBS_MODE, strings(&[""])),
        )
        .table(
            Some(columns::DATA_DESCRIPTION_TABLE),
            MemTable::new().with_column(columns::SPECTRAL_WINDOW_ID, MemColumn::I32(vec![0])),
        )
        .table(
            Some(columns::SPECTRAL_WINDOW_TABLE),
            MemTable::new()
                .with_column(columns::NUM_CHAN, MemColumn::I32(vec![NUM_CHANS as i32]))
                .with_column(
                    columns::CHAN_FREQ,
                    MemColumn::F64Array(vec![(0..NUM_CHANS)
                        .map(|c| 1.4e9 + c as f64 * 1e6)
                        .collect()]),
                )
                .with_column(columns::TOTAL_BANDWIDTH, MemColumn::F64(vec![8e6])),
        )
        .build()
        .unwrap()
}

#[test]
fn test_pair_and_spw_selection() -> Result<(), MsIndexError> {
    let catalog = IndexCatalog::build(dataset(), CatalogConfig::default())?;
    let index = catalog.index()?;
    assert_eq!(index.scans_for_field(0), vec![1]);
    assert_eq!(index.scans_for_field_name("NGC253"), vec![2]);

    let mut view = RowView::new(&catalog, Criteria::new())?;
    view.set_antenna_pair(0usize, 1usize)?;
    view.set_spw(0)?;
    view.materialize()?;

    assert_eq!(view.rows()?.as_slice(), &[0, 3, 6, 9]);
    for (a1, a2) in view.antenna1()?.iter().zip(view.antenna2()?) {
        assert!((*a1, *a2) == (0, 1) || (*a1, *a2) == (1, 0));
    }
    assert_eq!(view.data()?.dim(), (4, NUM_CHANS, 4));
    let time_averaged = view.time_averaged()?;
    assert_abs_diff_eq!(time_averaged[(0, 0)].re, 4.5);
    Ok(())
}

#[test]
fn test_no_intents() -> Result<(), MsIndexError> {
    let catalog = IndexCatalog::build(dataset(), CatalogConfig::default())?;
    let index = catalog.index()?;
    assert!(index.unique_intents().is_empty());
    for &scan in index.unique_scans() {
        assert!(index.intents_for_scan(scan).is_empty());
    }
    assert!(index.intents_for_spw(0).is_empty());
    assert!(index.spws_for_intent("OBSERVE_TARGET#ON_SOURCE").is_empty());
    Ok(())
}

#[test]
fn test_selection_agrees_with_naive_filter() -> Result<(), MsIndexError> {
    let catalog = IndexCatalog::build(dataset(), CatalogConfig::default())?;
    let builder = catalog.selection_builder()?;
    let mut main_table = catalog.store().open(None)?;
    let keys = main_table.row_keys()?;

    let antennas = [None, Some(AntennaRef::Id(0)), Some("m002".parse().unwrap())];
    let scans = [None, Some(1), Some(2), Some(5)];
    let correlations = [
        CorrelationClass::All,
        CorrelationClass::Cross,
        CorrelationClass::Auto,
    ];
    for (antenna1, antenna2, scan, correlation) in
        iproduct!(&antennas, &antennas, &scans, &correlations)
    {
        let criteria = Criteria {
            antenna1: antenna1.clone(),
            antenna2: antenna2.clone(),
            scan: *scan,
            correlation: *correlation,
            ..Default::default()
        };
        let predicate = builder.build(&criteria)?;
        assert_eq!(
            main_table.query(&predicate)?,
            predicate.naive_filter(&keys),
            "{predicate}"
        );
        // The same criteria give the same predicate.
        assert_eq!(builder.build(&criteria)?, predicate);
    }
    Ok(())
}

#[test]
fn test_config_from_file() -> Result<(), MsIndexError> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            auto_materialize = false
            scan_time_tolerance = 10.0
        "#}
        .as_bytes(),
    )
    .unwrap();
    let config = CatalogConfig::from_file(file.path())?;
    let catalog = IndexCatalog::build(dataset(), config)?;

    assert_eq!(catalog.scans_for_time_default(T0 + 15.0)?, Some(1));
    assert_eq!(catalog.scans_for_time_default(T0 + 95.0)?, Some(2));
    assert_eq!(catalog.scans_for_time_default(T0 + 50.0)?, None);

    let mut view = RowView::new(&catalog, Criteria::new().with_scan(2))?;
    assert!(!view.is_materialized());
    view.materialize()?;
    assert_eq!(view.rows()?.len(), 6);
    Ok(())
}

#[test]
fn test_rebuild_keeps_queries_stable() -> Result<(), MsIndexError> {
    let mut catalog = IndexCatalog::build(dataset(), CatalogConfig::default())?;
    let before = catalog.index()?.clone();
    let generation = catalog.generation();
    catalog.rebuild()?;
    assert_ne!(catalog.generation(), generation);
    assert_eq!(catalog.index()?, &before);
    Ok(())
}
