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

use core::num::NonZeroUsize;
use embassy_time::Duration;

/// Results with a magnitude below this many grams are reported as exactly zero.
pub const ZERO_CLAMP_GRAMS: f32 = 1.0;

const fn sample_count(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("sample count must be at least one"),
    }
}

/// Timing of individual sensor reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Sleep between two readiness polls.
    pub poll_interval: Duration,
    /// Give up on a read if the sensor has not signalled ready within this time.
    pub ready_timeout: Duration,
    /// Settle time for the analog front end between consecutive reads of an average.
    pub inter_sample_delay: Duration,
}

impl SamplingConfig {
    pub const DEFAULT: Self = Self {
        poll_interval: Duration::from_millis(1),
        ready_timeout: Duration::from_millis(1000),
        inter_sample_delay: Duration::from_millis(50),
    };
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationConfig {
    /// Samples per offset or loaded measurement.
    pub samples: NonZeroUsize,
    /// Time given to the operator to place the reference load.
    pub settle_delay: Duration,
}

impl CalibrationConfig {
    pub const DEFAULT: Self = Self {
        samples: sample_count(15),
        settle_delay: Duration::from_millis(1500),
    };
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportingConfig {
    /// Wait after power up before the startup tare is taken.
    pub stabilisation_delay: Duration,
    pub tare_samples: NonZeroUsize,
    pub report_samples: NonZeroUsize,
    pub report_interval: Duration,
}

impl ReportingConfig {
    pub const DEFAULT: Self = Self {
        stabilisation_delay: Duration::from_millis(2000),
        tare_samples: sample_count(10),
        report_samples: sample_count(5),
        report_interval: Duration::from_millis(500),
    };
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
