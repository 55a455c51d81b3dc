// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


use num_traits::{Float, FloatConst};

/// Remove the 2π jumps from a sequence of phases \[radians\]. Whenever
/// consecutive raw phases differ by more than π, every following phase is
/// shifted by a multiple of 2π.
///
/// # Examples
///
/// `unwrap_phase(&[0.1, 3.2, -3.0])` gives `[0.1, 3.2, 3.283...]`.
pub fn unwrap_phase<F: Float + FloatConst>(phases: &[F]) -> Vec<F> {
    let two_pi = F::TAU();
    let mut offset = F::zero();
    let mut unwrapped = Vec::with_capacity(phases.len());
    for (i, &phase) in phases.iter().enumerate() {
        if i > 0 {
            let diff = phase - phases[i - 1];
            if diff > F::PI() {
                offset = offset - two_pi;
            } else if diff < -F::PI() {
                offset = offset + two_pi;
            }
        }
        unwrapped.push(phase + offset);
    }
    unwrapped
}
