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

pub mod conversion;
pub mod interface;
pub mod sampler;
#[allow(clippy::module_inception)]
pub mod weight;

/// One unprocessed count from the ADC.
pub type RawSample = i32;

/// Integer mean of a run of [`RawSample`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AveragedReading(i32);

/// Averaged reading taken with nothing on the platform.
pub type ZeroOffset = AveragedReading;

impl AveragedReading {
    pub const fn new(counts: i32) -> Self {
        Self(counts)
    }

    pub const fn counts(self) -> i32 {
        self.0
    }

    /// Counts above `offset`. Negative when the reading sits below the offset.
    pub const fn net_of(self, offset: ZeroOffset) -> Self {
        Self(self.0.saturating_sub(offset.0))
    }
}

/// Net counts per gram.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScaleFactor(f32);

impl ScaleFactor {
    pub const fn new(counts_per_gram: f32) -> Self {
        Self(counts_per_gram)
    }

    pub const fn counts_per_gram(self) -> f32 {
        self.0
    }
}

/// Reference mass used for calibration. Always finite and strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KnownWeight(f32);

impl KnownWeight {
    pub fn grams(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for KnownWeight {
    type Error = InvalidCalibrationInput;

    fn try_from(grams: f32) -> Result<Self, Self::Error> {
        if grams.is_finite() && grams > 0.0 {
            Ok(Self(grams))
        } else {
            Err(InvalidCalibrationInput)
        }
    }
}

/// Reported mass in grams.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Weight(f32);

impl Weight {
    pub const ZERO: Self = Self(0.0);

    pub const fn from_grams(grams: f32) -> Self {
        Self(grams)
    }

    pub const fn grams(self) -> f32 {
        self.0
    }
}

/// A calibration value was rejected: a non-positive, non-numeric or non-finite
/// reference weight, or a scale factor that cannot be divided by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidCalibrationInput;

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<StrainGaugeE> {
    StrainGaugeReadingError(StrainGaugeE),
    /// The sensor did not signal a conversion within the configured ready timeout.
    SensorTimeout,
    InvalidCalibrationInput,
}

impl<StrainGaugeE> From<InvalidCalibrationInput> for Error<StrainGaugeE> {
    fn from(_: InvalidCalibrationInput) -> Self {
        Error::InvalidCalibrationInput
    }
}
