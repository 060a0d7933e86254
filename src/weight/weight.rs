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

use crate::weight::conversion::WeightConverter;
use crate::weight::interface::AsyncStrainGaugeInterface;
use crate::weight::sampler::Sampler;
use crate::weight::{Error, Weight, ZeroOffset};
use core::num::NonZeroUsize;

/// Runtime weighing: a sampler, the tare offset captured on the empty platform
/// and the configured conversion.
pub struct WeightScale<StrainGauge> {
    sampler: Sampler<StrainGauge>,
    tare_offset: ZeroOffset,
    converter: WeightConverter,
}

impl<StrainGauge, StrainGaugeE> WeightScale<StrainGauge>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
{
    /// Starts untared, so readings are relative to zero counts until [`Self::tare`] runs.
    pub fn new(sampler: Sampler<StrainGauge>, converter: WeightConverter) -> Self {
        Self {
            sampler,
            tare_offset: ZeroOffset::new(0),
            converter,
        }
    }

    pub async fn tare(&mut self, samples: NonZeroUsize) -> Result<(), Error<StrainGaugeE>> {
        self.tare_offset = self.sampler.average(samples).await?;
        debug!("Tare offset = {}", self.tare_offset.counts());
        Ok(())
    }

    pub fn tare_offset(&self) -> ZeroOffset {
        self.tare_offset
    }

    pub fn is_ready(&mut self) -> Result<bool, Error<StrainGaugeE>> {
        self.sampler.is_ready()
    }

    pub async fn get_weight_grams(
        &mut self,
        samples: NonZeroUsize,
    ) -> Result<Weight, Error<StrainGaugeE>> {
        let reading = self.sampler.average(samples).await?;
        let tared_reading = reading.net_of(self.tare_offset);
        trace!("Tared reading = {}", tared_reading.counts());
        Ok(self.converter.to_weight(tared_reading))
    }
}
