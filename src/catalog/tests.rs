// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    config::ConfigError,
    store::{MemColumn, MemTable, MemoryStore},
    tests::*,
};

#[test]
fn test_unbuilt_catalog_is_missing_keys() {
    let catalog = IndexCatalog::new(synthetic_store(), CatalogConfig::default());
    assert!(!catalog.is_built());
    assert_eq!(catalog.generation(), 0);
    let err = catalog.index().unwrap_err();
    assert!(matches!(err, CatalogError::NotBuilt { .. }));
    assert!(err.is_missing_key());
    assert!(catalog.resolver().is_err());
}

#[test]
fn test_scans_and_times() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    assert_eq!(index.unique_scans(), &[1, 2, 3]);
    assert_eq!(index.times_for_scan(1), &[T0, T0 + 10.0]);
    assert_eq!(index.times_for_scan(3), &[T0 + 200.0]);
    assert!(index.times_for_scan(99).is_empty());
    assert_eq!(
        index.times_for_scans(&[3, 1, 3]),
        vec![T0, T0 + 10.0, T0 + 200.0]
    );

    let (first, last) = index.epochs_for_scan(2).unwrap();
    assert_abs_diff_eq!(
        last.to_gpst_seconds() - first.to_gpst_seconds(),
        10.0,
        epsilon = 1e-6
    );
    let (first, last) = index.epochs_for_scan(3).unwrap();
    assert_eq!(first, last);
    assert!(index.epochs_for_scan(4).is_none());
}

#[test]
fn test_scan_for_time() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    assert_eq!(index.scans_for_time(T0 + 5.0, 0.0), Some(1));
    assert_eq!(index.scans_for_time(T0 + 110.0, 0.0), Some(2));
    assert_eq!(index.scans_for_time(T0 + 50.0, 0.0), None);
    assert_eq!(index.scans_for_time(T0 + 112.0, 2.0), Some(2));
    // Both scans 2 and 3 are within the tolerance; the lower scan wins.
    assert_eq!(index.scans_for_time(T0 + 150.0, 50.0), Some(2));
}

#[test]
fn test_states_and_intents() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    assert_eq!(
        index.intents_for_state(0),
        &["CALIBRATE_FLUX#ON_SOURCE", "CALIBRATE_BANDPASS#ON_SOURCE"]
    );
    assert!(index.intents_for_state(2).is_empty());
    assert!(index.intents_for_state(7).is_empty());
    assert_eq!(
        index.unique_intents(),
        &[
            "CALIBRATE_FLUX#ON_SOURCE",
            "CALIBRATE_BANDPASS#ON_SOURCE",
            "OBSERVE_TARGET#ON_SOURCE"
        ]
    );
    assert_eq!(index.states_for_scan(2), vec![1]);
    assert_eq!(index.scans_for_state(1), vec![2]);
    assert_eq!(
        index.intents_for_scan(1),
        vec!["CALIBRATE_FLUX#ON_SOURCE", "CALIBRATE_BANDPASS#ON_SOURCE"]
    );
    assert!(index.intents_for_scan(3).is_empty());
    assert_eq!(index.scans_for_intent("CALIBRATE_BANDPASS#ON_SOURCE"), vec![1]);
    assert!(index.scans_for_intent("CALIBRATE_POLARIZATION").is_empty());
}

#[test]
fn test_fields() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    assert_eq!(index.scans_for_field(0), vec![1]);
    assert_eq!(index.scans_for_field(2), vec![3]);
    assert_eq!(index.scans_for_field_name("TARGET"), vec![2, 3]);
    assert!(index.scans_for_field_name("nope").is_empty());
    assert_eq!(index.fields_for_scan(2), vec![1]);
    assert_eq!(index.field_names_for_scan(3).unwrap(), vec!["TARGET"]);
    assert_eq!(index.times_for_field("3C286"), &[T0, T0 + 10.0]);
    assert_eq!(
        index.times_for_field("TARGET"),
        &[T0 + 100.0, T0 + 110.0, T0 + 200.0]
    );
}

#[test]
fn test_antenna_pairs() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    let expected = [T0, T0 + 10.0, T0 + 100.0, T0 + 110.0];
    assert_eq!(index.times_for_antenna_pair(0, 1).unwrap(), &expected);
    assert_eq!(index.times_for_antenna_pair(1, 0).unwrap(), &expected);
    assert_eq!(
        index.times_for_antenna_pair_key("antenna_1_antenna_0").unwrap(),
        &expected
    );
    assert_eq!(index.times_for_antenna_pair(0, 0).unwrap().len(), 5);
    // A real pair without data.
    assert!(index.times_for_antenna_pair(1, 1).unwrap().is_empty());

    let err = index.times_for_antenna_pair(0, 3).unwrap_err();
    assert!(err.is_missing_key());
    assert!(index.times_for_antenna_pair_key("baseline_1_0").is_err());

    assert_eq!(index.antenna_pairs().count(), 4);
}

#[test]
fn test_antenna_pair_key() {
    let key = AntennaPairKey::new(1, 4);
    assert_eq!(key, AntennaPairKey::new(4, 1));
    assert_eq!(key.to_string(), "antenna_4_antenna_1");
    assert_eq!(key.antennas(), (1, 4));
    // Keys written "backwards" still work.
    assert_eq!("antenna_1_antenna_4".parse::<AntennaPairKey>().unwrap(), key);
    assert!("antenna_1_antenna_x".parse::<AntennaPairKey>().is_err());
    assert!("antenna_1".parse::<AntennaPairKey>().is_err());
}

#[test]
fn test_spws() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    assert_eq!(index.usable_spws(), vec![0, 2]);
    assert_eq!(index.dropped_spws(), &[1]);
    assert_eq!(index.spw_for_data_desc(1), Some(1));
    assert_eq!(index.spw_for_data_desc(3), None);
    assert_eq!(index.data_descs_for_spw(2), vec![2]);
    assert!(index.data_descs_for_spw(1).is_empty());

    let spw0 = index.spw_info(0).unwrap().unwrap();
    assert_eq!(spw0.num_chans, 8);
    assert_eq!(spw0.name.as_deref(), Some("SPW0"));
    assert_abs_diff_eq!(spw0.mean_freq, 1e9 + 3.5e6);
    // There's no TOTAL_BANDWIDTH column; the channel widths are summed.
    assert_abs_diff_eq!(spw0.total_bandwidth, 8e6);
    assert_eq!(index.num_chans_for_spw(2).unwrap(), Some(16));
    assert_abs_diff_eq!(index.mean_freq_for_spw(2).unwrap().unwrap(), 3e9 + 7.5e6);

    // Dropped, but known.
    assert_eq!(index.spw_info(1).unwrap(), None);
    // Not in the dataset at all.
    assert!(index.spw_info(3).unwrap_err().is_missing_key());

    assert_eq!(index.polarizations_for_spw(0), &[CorrType::XX, CorrType::YY]);
    assert!(index.polarizations_for_spw(1).is_empty());
}

#[test]
fn test_spw_cross_references() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    assert_eq!(index.scans_for_spw(0), vec![1, 2]);
    assert_eq!(index.scans_for_spw(2), vec![2, 3]);
    assert!(index.scans_for_spw(1).is_empty());
    assert_eq!(index.spws_for_scan(2), vec![0, 2]);
    assert_eq!(index.spws_for_scan(1), vec![0]);

    assert_eq!(index.fields_for_spw(0), vec![0, 1]);
    assert_eq!(index.spws_for_field(2), vec![2]);
    assert_eq!(index.spws_for_field(1), vec![0, 2]);

    assert_eq!(
        index.intents_for_spw(0),
        vec![
            "CALIBRATE_FLUX#ON_SOURCE",
            "CALIBRATE_BANDPASS#ON_SOURCE",
            "OBSERVE_TARGET#ON_SOURCE"
        ]
    );
    assert_eq!(index.intents_for_spw(2), vec!["OBSERVE_TARGET#ON_SOURCE"]);
    assert_eq!(index.spws_for_intent("OBSERVE_TARGET#ON_SOURCE"), vec![0, 2]);
    assert_eq!(index.spws_for_intent("CALIBRATE_FLUX#ON_SOURCE"), vec![0]);
}

#[test]
fn test_keep_auxiliary_spws() {
    let config = CatalogConfig {
        drop_auxiliary_spws: false,
        ..Default::default()
    };
    let catalog = IndexCatalog::build(synthetic_store(), config).unwrap();
    let index = catalog.index().unwrap();
    assert_eq!(index.usable_spws(), vec![0, 1, 2]);
    assert!(index.dropped_spws().is_empty());
    assert_eq!(index.scans_for_spw(1), vec![1]);
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut catalog = synthetic_catalog();
    let first_generation = catalog.generation();
    let before = catalog.index().unwrap().clone();
    catalog.rebuild().unwrap();
    assert_ne!(catalog.generation(), first_generation);
    assert_eq!(catalog.index().unwrap(), &before);
}

#[test]
fn test_generations_are_unique() {
    let a = synthetic_catalog();
    let b = synthetic_catalog();
    assert_ne!(a.generation(), 0);
    assert_ne!(a.generation(), b.generation());
}

#[test]
fn test_missing_state_table() {
    let store = synthetic_builder(&[columns::STATE_TABLE]).build().unwrap();
    let catalog = IndexCatalog::build(store, CatalogConfig::default()).unwrap();
    let index = catalog.index().unwrap();
    assert!(index.unique_intents().is_empty());
    assert!(index.intents_for_scan(1).is_empty());
    assert_eq!(index.states_for_scan(1), vec![0]);
}

#[test]
fn test_field_ids_beyond_field_table() {
    // Only the first field is listed; fields 1 and 2 are still referred to by
    // the main table.
    let store = synthetic_builder(&[columns::FIELD_TABLE])
        .table(
            Some(columns::FIELD_TABLE),
            MemTable::new().with_column(columns::NAME, MemColumn::Str(vec!["3C286".into()])),
        )
        .build()
        .unwrap();
    let catalog = IndexCatalog::build(store, CatalogConfig::default()).unwrap();
    let index = catalog.index().unwrap();
    assert_eq!(
        index.resolver().name_for_id(NameKind::Field, 2).unwrap(),
        crate::resolver::UNKNOWN_NAME
    );
    assert_eq!(
        index.times_for_field(crate::resolver::UNKNOWN_NAME),
        &[T0 + 100.0, T0 + 110.0, T0 + 200.0]
    );
}

fn store_with_main(main: MemTable) -> MemoryStore {
    synthetic_builder(&[]).table(None, main).build().unwrap()
}

#[test]
fn test_failed_rebuild_keeps_old_maps() {
    let mut catalog = synthetic_catalog();
    let generation = catalog.generation();
    let before = catalog.index().unwrap().clone();

    // Swap in a catalog whose store has an empty main table, with the old
    // maps.
    let mut broken = IndexCatalog::new(
        store_with_main(MemTable::main(&[])),
        CatalogConfig::default(),
    );
    assert!(matches!(
        broken.rebuild(),
        Err(CatalogError::MainTableEmpty)
    ));
    assert!(!broken.is_built());

    broken.index = catalog.index.take();
    broken.generation = generation;
    assert!(broken.rebuild().is_err());
    assert_eq!(broken.generation(), generation);
    assert_eq!(broken.index().unwrap(), &before);
}

#[test]
fn test_bad_antenna_numbers() {
    let mut rows = main_rows();
    rows[0].antenna2 = 3;
    let result = IndexCatalog::build(store_with_main(MemTable::main(&rows)), CatalogConfig::default());
    assert!(matches!(result, Err(CatalogError::AntennaNumTooBig(3))));

    let mut rows = main_rows();
    rows[5].antenna1 = -1;
    let result = IndexCatalog::build(store_with_main(MemTable::main(&rows)), CatalogConfig::default());
    assert!(matches!(
        result,
        Err(CatalogError::NegativeId {
            column: "ANTENNA1",
            value: -1
        })
    ));
}

#[test]
fn test_empty_antenna_table() {
    let store = synthetic_builder(&[columns::ANTENNA_TABLE])
        .table(
            Some(columns::ANTENNA_TABLE),
            MemTable::new().with_column(columns::NAME, MemColumn::Str(vec![])),
        )
        .build()
        .unwrap();
    assert!(matches!(
        IndexCatalog::build(store, CatalogConfig::default()),
        Err(CatalogError::AntennaTableEmpty)
    ));
}

#[test]
fn test_chan_freq_mismatch() {
    let spw_table = spw_table().with_column(
        columns::CHAN_FREQ,
        MemColumn::F64Array(vec![chan_freqs(0), chan_freqs(1), vec![1.0]]),
    );
    let store = synthetic_builder(&[columns::SPECTRAL_WINDOW_TABLE])
        .table(Some(columns::SPECTRAL_WINDOW_TABLE), spw_table)
        .build()
        .unwrap();
    assert!(matches!(
        IndexCatalog::build(store, CatalogConfig::default()),
        Err(CatalogError::ChanFreqMismatch {
            spw: 2,
            num_chans: 16,
            num_freqs: 1
        })
    ));
}

#[test]
fn test_split_intents() {
    assert_eq!(
        split_intents(" A#B ,C,, D "),
        vec!["A#B".to_string(), "C".to_string(), "D".to_string()]
    );
    assert!(split_intents("").is_empty());
}

#[test]
fn test_configured_scan_time_tolerance() {
    let catalog = synthetic_catalog();
    assert_eq!(catalog.scans_for_time_default(T0 + 12.0).unwrap(), None);

    let config = CatalogConfig {
        scan_time_tolerance: 5.0,
        ..Default::default()
    };
    let catalog = IndexCatalog::build(synthetic_store(), config).unwrap();
    assert_eq!(catalog.scans_for_time_default(T0 + 12.0).unwrap(), Some(1));

    let unbuilt = IndexCatalog::new(synthetic_store(), CatalogConfig::default());
    assert!(unbuilt.scans_for_time_default(T0).is_err());
}

#[test]
fn test_bad_tolerance_is_rejected() {
    for tolerance in [-1.0, f64::NAN] {
        let config = CatalogConfig {
            scan_time_tolerance: tolerance,
            ..Default::default()
        };
        let result = IndexCatalog::build(synthetic_store(), config);
        assert!(matches!(
            result,
            Err(CatalogError::Config(ConfigError::BadTolerance(_)))
        ));

        let config = CatalogConfig {
            scan_time_tolerance: tolerance,
            ..Default::default()
        };
        let mut catalog = IndexCatalog::new(synthetic_store(), config);
        assert!(catalog.rebuild().is_err());
        assert!(!catalog.is_built());
        assert_eq!(catalog.generation(), 0);
    }
}

#[test]
fn test_scans_and_fields_agree() {
    let catalog = synthetic_catalog();
    let index = catalog.index().unwrap();
    for &scan in index.unique_scans() {
        for field in index.fields_for_scan(scan) {
            assert!(index.scans_for_field(field).contains(&scan));
        }
    }
    for field in 0..FIELD_NAMES.len() {
        for scan in index.scans_for_field(field) {
            assert!(index.fields_for_scan(scan).contains(&field));
        }
    }
}

#[test]
fn test_antenna_names_round_trip() {
    let catalog = synthetic_catalog();
    let resolver = catalog.resolver().unwrap();
    for id in 0..resolver.num_antennas() {
        let name = resolver.name_for_id(NameKind::Antenna, id as i64).unwrap();
        assert_eq!(resolver.id_for_name(NameKind::Antenna, name), Some(id));
    }
}
