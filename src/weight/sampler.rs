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

use crate::config::SamplingConfig;
use crate::weight::interface::AsyncStrainGaugeInterface;
use crate::weight::{AveragedReading, Error, RawSample};
use core::num::NonZeroUsize;
use embassy_time::{Instant, Timer};

/// Exclusive owner of the strain gauge. Every read goes through here so that the
/// ready wait is always bounded.
pub struct Sampler<StrainGauge> {
    strain_gauge: StrainGauge,
    config: SamplingConfig,
}

impl<StrainGauge, StrainGaugeE> Sampler<StrainGauge>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
{
    pub async fn new(
        mut strain_gauge: StrainGauge,
        config: SamplingConfig,
    ) -> Result<Self, Error<StrainGaugeE>> {
        strain_gauge
            .initialize()
            .await
            .map_err(Error::StrainGaugeReadingError)?;
        Ok(Self {
            strain_gauge,
            config,
        })
    }

    pub fn is_ready(&mut self) -> Result<bool, Error<StrainGaugeE>> {
        self.strain_gauge
            .is_ready()
            .map_err(Error::StrainGaugeReadingError)
    }

    /// Polls the gauge until a conversion is pending, then reads it.
    pub async fn read_one(&mut self) -> Result<RawSample, Error<StrainGaugeE>> {
        let deadline = Instant::now() + self.config.ready_timeout;
        while !self.is_ready()? {
            if Instant::now() >= deadline {
                warn!(
                    "Strain gauge not ready after {} ms",
                    self.config.ready_timeout.as_millis()
                );
                return Err(Error::SensorTimeout);
            }
            Timer::after(self.config.poll_interval).await;
        }

        self.strain_gauge
            .get_next_reading()
            .await
            .map_err(Error::StrainGaugeReadingError)
    }

    /// Mean of `samples` consecutive reads, truncated toward zero.
    pub async fn average(
        &mut self,
        samples: NonZeroUsize,
    ) -> Result<AveragedReading, Error<StrainGaugeE>> {
        let mut sum: i64 = 0;
        for i in 0..samples.get() {
            if i > 0 {
                Timer::after(self.config.inter_sample_delay).await;
            }
            let sample = self.read_one().await?;
            trace!("Sample {} = {}", i, sample);
            sum += i64::from(sample);
        }

        let mean = sum / samples.get() as i64;
        debug!("Average of {} samples = {}", samples.get(), mean);
        Ok(AveragedReading::new(mean as i32))
    }
}
