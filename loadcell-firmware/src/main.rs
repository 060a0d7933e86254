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

#![no_std]
#![no_main]

use assign_resources::assign_resources;
use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, BufferedInterruptHandler, BufferedUart};
use embassy_rp::{bind_interrupts, peripherals};
use loadcell_scale::application::console::Console;
use loadcell_scale::config::SamplingConfig;
use loadcell_scale::weight::interface::hx711async::{Hx711Async, Hx711Gain};
use loadcell_scale::weight::sampler::Sampler;
use static_cell::StaticCell;
#[allow(unused_imports)]
use {defmt_rtt as _, panic_probe as _};

/// Counts per gram, copied by hand from the output of a `calibration` build.
const CALIBRATION_FACTOR: f32 = 400.40;

const CONSOLE_BAUD_RATE: u32 = 115_200;
const CONSOLE_BUFFER_SIZE: usize = 256;

assign_resources! {
    strain_gauge_io: StrainGaugeResources {
        clk_pin: PIN_14,
        data_pin: PIN_15,
    },
    console_uart: ConsoleUartResources {
        uart: UART0,
        tx_pin: PIN_0,
        rx_pin: PIN_1,
    }
}

bind_interrupts!(struct UartIrqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    let resources = split_resources!(p);

    info!(
        "{} v{} ({})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown")
    );

    #[cfg(feature = "calibration")]
    spawner
        .spawn(calibration_task(resources.strain_gauge_io, resources.console_uart))
        .unwrap();

    #[cfg(not(feature = "calibration"))]
    spawner
        .spawn(weighing_task(resources.strain_gauge_io, resources.console_uart))
        .unwrap();
}

fn console_uart(resources: ConsoleUartResources) -> BufferedUart {
    static TX_BUF: StaticCell<[u8; CONSOLE_BUFFER_SIZE]> = StaticCell::new();
    static RX_BUF: StaticCell<[u8; CONSOLE_BUFFER_SIZE]> = StaticCell::new();

    let mut config = uart::Config::default();
    config.baudrate = CONSOLE_BAUD_RATE;

    BufferedUart::new(
        resources.uart,
        resources.tx_pin,
        resources.rx_pin,
        UartIrqs,
        TX_BUF.init([0; CONSOLE_BUFFER_SIZE]),
        RX_BUF.init([0; CONSOLE_BUFFER_SIZE]),
        config,
    )
}

fn strain_gauge(resources: StrainGaugeResources) -> Hx711Async<Output<'static>, Input<'static>> {
    let clk_pin_out = Output::new(resources.clk_pin, Level::Low);
    let data_pin = Input::new(resources.data_pin, Pull::Up);
    Hx711Async::new(clk_pin_out, data_pin, Hx711Gain::Gain128)
}

#[cfg(not(feature = "calibration"))]
#[embassy_executor::task]
async fn weighing_task(strain_gauge_resources: StrainGaugeResources, console_resources: ConsoleUartResources) {
    use loadcell_scale::application::weighing_manager::WeighingManager;
    use loadcell_scale::config::ReportingConfig;
    use loadcell_scale::weight::conversion::WeightConverter;
    use loadcell_scale::weight::weight::WeightScale;
    use loadcell_scale::weight::ScaleFactor;

    let console = Console::new(console_uart(console_resources));
    let sampler = match Sampler::new(strain_gauge(strain_gauge_resources), SamplingConfig::DEFAULT).await {
        Ok(sampler) => sampler,
        Err(e) => {
            error!("Strain gauge initialisation failed: {}", e);
            return;
        }
    };
    let converter = match WeightConverter::new(ScaleFactor::new(CALIBRATION_FACTOR)) {
        Ok(converter) => converter,
        Err(e) => {
            error!("Unusable calibration factor {}: {}", CALIBRATION_FACTOR, e);
            return;
        }
    };

    let mut weighing_manager = WeighingManager::new(
        WeightScale::new(sampler, converter),
        console,
        ReportingConfig::DEFAULT,
    );
    weighing_manager.run().await;
}

#[cfg(feature = "calibration")]
#[embassy_executor::task]
async fn calibration_task(strain_gauge_resources: StrainGaugeResources, console_resources: ConsoleUartResources) {
    use loadcell_scale::application::calibration_manager::CalibrationManager;
    use loadcell_scale::config::CalibrationConfig;

    let console = Console::new(console_uart(console_resources));
    let sampler = match Sampler::new(strain_gauge(strain_gauge_resources), SamplingConfig::DEFAULT).await {
        Ok(sampler) => sampler,
        Err(e) => {
            error!("Strain gauge initialisation failed: {}", e);
            return;
        }
    };

    let mut calibration_manager = CalibrationManager::new(sampler, console, CalibrationConfig::DEFAULT);
    calibration_manager.run().await;
}
