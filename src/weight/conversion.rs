// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::config::ZERO_CLAMP_GRAMS;
use crate::weight::{AveragedReading, InvalidCalibrationInput, KnownWeight, ScaleFactor, Weight};
#[allow(unused_imports)]
use micromath::F32Ext;

/// Converts offset corrected counts to grams. Anything lighter than
/// [`ZERO_CLAMP_GRAMS`] either way is reported as exactly zero.
pub fn to_weight(reading: AveragedReading, scale: ScaleFactor) -> Weight {
    let grams = reading.counts() as f32 / scale.counts_per_gram();
    if grams.abs() < ZERO_CLAMP_GRAMS {
        Weight::ZERO
    } else {
        Weight::from_grams(grams)
    }
}

/// Scale factor that maps the net of `loaded` over `offset` onto `known_weight`.
///
/// The net is not checked. A reversed bridge gives a negative factor and an
/// unchanged platform gives zero; both are returned as is for the operator to judge.
pub fn estimate(
    offset: AveragedReading,
    loaded: AveragedReading,
    known_weight: KnownWeight,
) -> ScaleFactor {
    let net = loaded.net_of(offset);
    ScaleFactor::new(net.counts() as f32 / known_weight.grams())
}

/// Weight conversion bound to the scale factor chosen at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightConverter {
    scale: ScaleFactor,
}

impl WeightConverter {
    pub fn new(scale: ScaleFactor) -> Result<Self, InvalidCalibrationInput> {
        let counts_per_gram = scale.counts_per_gram();
        if counts_per_gram.is_finite() && counts_per_gram != 0.0 {
            Ok(Self { scale })
        } else {
            Err(InvalidCalibrationInput)
        }
    }

    pub fn scale(&self) -> ScaleFactor {
        self.scale
    }

    pub fn to_weight(&self, reading: AveragedReading) -> Weight {
        to_weight(reading, self.scale)
    }
}
