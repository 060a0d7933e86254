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

use crate::application::console::{Console, ConsoleError};
use crate::config::ReportingConfig;
use crate::weight::interface::AsyncStrainGaugeInterface;
use crate::weight::weight::WeightScale;
use crate::weight::{Error, Weight};
use embassy_time::{Ticker, Timer};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WeightReport {
    Weight(Weight),
    SensorNotConnected,
}

/// Tares once at startup, then prints the weight on a fixed interval.
pub struct WeighingManager<StrainGauge, IO> {
    weight_scale: WeightScale<StrainGauge>,
    console: Console<IO>,
    config: ReportingConfig,
}

impl<StrainGauge, StrainGaugeE, IO> WeighingManager<StrainGauge, IO>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
    IO: embedded_io_async::Write,
{
    pub fn new(weight_scale: WeightScale<StrainGauge>, console: Console<IO>, config: ReportingConfig) -> Self {
        Self {
            weight_scale,
            console,
            config,
        }
    }

    pub async fn run(&mut self) -> ! {
        if self.start().await.is_err() {
            warn!("Startup messages could not be written");
        }

        let mut periodic_timer = Ticker::every(self.config.report_interval);
        loop {
            if self.report().await.is_err() {
                warn!("Weight report could not be written");
            }
            periodic_timer.next().await;
        }
    }

    /// Waits for the load cell to settle and tares it. A tare that times out
    /// leaves the offset at zero; the reports that follow say the sensor is missing.
    pub async fn start(&mut self) -> Result<(), ConsoleError<IO::Error>> {
        self.console
            .println(format_args!("Waiting for the load cell to stabilise..."))
            .await?;
        Timer::after(self.config.stabilisation_delay).await;

        match self.weight_scale.tare(self.config.tare_samples).await {
            Ok(()) => {
                self.console
                    .println(format_args!("Load cell ready."))
                    .await
            }
            Err(_) => {
                warn!("Startup tare failed");
                self.console
                    .println(format_args!("Tare failed, readings are not zeroed."))
                    .await
            }
        }
    }

    pub async fn measure(&mut self) -> WeightReport {
        match self.weight_scale.is_ready() {
            Ok(true) => {}
            Ok(false) | Err(_) => return WeightReport::SensorNotConnected,
        }

        match self
            .weight_scale
            .get_weight_grams(self.config.report_samples)
            .await
        {
            Ok(weight) => WeightReport::Weight(weight),
            Err(Error::SensorTimeout) => {
                warn!("Sensor stopped responding mid measurement");
                WeightReport::SensorNotConnected
            }
            Err(_) => {
                warn!("Sensor read failed");
                WeightReport::SensorNotConnected
            }
        }
    }

    /// One poll, convert and print cycle.
    pub async fn report(&mut self) -> Result<WeightReport, ConsoleError<IO::Error>> {
        let report = self.measure().await;
        match report {
            WeightReport::Weight(weight) => {
                self.console
                    .println(format_args!("Weight: {:.2} g", weight.grams()))
                    .await?
            }
            WeightReport::SensorNotConnected => {
                self.console
                    .println(format_args!("HX711 not connected!"))
                    .await?
            }
        }
        Ok(report)
    }
}
