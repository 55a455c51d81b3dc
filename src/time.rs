// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions around time.

use hifitime::Epoch;

/// Convert a casacore TIME value (UTC seconds since the MJD epoch) to an
/// [`Epoch`], tidying float errors.
pub fn casacore_utc_to_epoch(utc_time: f64) -> Epoch {
    // casacore stores the times as UTC seconds... but with an offset.
    let e = Epoch::from_utc_seconds(utc_time - hifitime::J1900_OFFSET * hifitime::SECONDS_PER_DAY);
    round_hundredths_of_a_second(e)
}

/// Some timestamps may be read in ever so slightly off from their true values
/// because of float errors. This function checks if a supplied [`Epoch`], when
/// represented as GPS seconds, is really close to a neat value in the
/// hundredths. If so, the value is rounded and returned.
///
/// e.g. The GPS time 1090008639.999405 should be 1090008640.0. Other examples
/// of usage are in the tests alongside this function.
pub(crate) fn round_hundredths_of_a_second(e: Epoch) -> Epoch {
    let e_gps = e.to_gpst_seconds() * 100.0;
    if (e_gps.round() - e_gps).abs() < 0.1 {
        Epoch::from_gpst_seconds(e_gps.round() / 100.0)
    } else {
        e
    }
}
