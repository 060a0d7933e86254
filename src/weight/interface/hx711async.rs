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

use crate::weight::interface::AsyncStrainGaugeInterface;
use embassy_time::{Duration, Ticker, Timer};

/// Input channel and gain used for the conversion that follows a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hx711Gain {
    #[default]
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    /// Clock pulses after the 24 data bits that select the next conversion.
    fn trailing_pulses(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => 1,
            Hx711Gain::Gain64 => 3,
            Hx711Gain::Gain32ChannelB => 2,
        }
    }
}

const POWER_MODE_CHANGE_DELAY: Duration = Duration::from_micros(60);
const CLK_HALF_PERIOD: Duration = Duration::from_micros(1);
const VALID_DATA_BITS: usize = 24;

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<OutPinE, InPinE> {
    OutPin(OutPinE),
    InPin(InPinE),
}

/// Sign extends a 24 bit two's complement conversion.
pub fn decode_reading(bits: u32) -> i32 {
    let shift = 32 - VALID_DATA_BITS as u32;
    ((bits << shift) as i32) >> shift
}

/// Bit-banged HX711 on a clock output and a data input.
pub struct Hx711Async<CLK, DATA> {
    clock_pin: CLK,
    data_pin: DATA,
    gain: Hx711Gain,
}

impl<CLK, DATA, ClkE, DataE> Hx711Async<CLK, DATA>
where
    CLK: embedded_hal::digital::OutputPin<Error = ClkE>,
    DATA: embedded_hal::digital::InputPin<Error = DataE>,
{
    pub fn new(clock_pin: CLK, data_pin: DATA, gain: Hx711Gain) -> Self {
        Self {
            clock_pin,
            data_pin,
            gain,
        }
    }

    /// The chip stays powered down while the clock is high, so it is pulled low
    /// and held for the wake up time.
    async fn power_up(&mut self) -> Result<(), Error<ClkE, DataE>> {
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        Timer::after(POWER_MODE_CHANGE_DELAY).await;
        Ok(())
    }

    async fn clock_pulse(&mut self, ticker: &mut Ticker) -> Result<bool, Error<ClkE, DataE>> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        ticker.next().await;
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        let bit = self.data_pin.is_high().map_err(Error::InPin)?;
        ticker.next().await;
        Ok(bit)
    }
}

impl<CLK, DATA, ClkE, DataE> AsyncStrainGaugeInterface for Hx711Async<CLK, DATA>
where
    CLK: embedded_hal::digital::OutputPin<Error = ClkE>,
    DATA: embedded_hal::digital::InputPin<Error = DataE>,
{
    type Error = Error<ClkE, DataE>;

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        self.power_up().await
    }

    fn is_ready(&mut self) -> Result<bool, Self::Error> {
        // DOUT goes low when conversion is ready
        self.data_pin.is_low().map_err(Error::InPin)
    }

    async fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        let mut clock_ticker = Ticker::every(CLK_HALF_PERIOD);
        clock_ticker.next().await;

        let mut bits: u32 = 0;
        for _ in 0..VALID_DATA_BITS {
            bits <<= 1;
            if self.clock_pulse(&mut clock_ticker).await? {
                bits |= 0x1;
            }
        }

        for _ in 0..self.gain.trailing_pulses() {
            self.clock_pulse(&mut clock_ticker).await?;
        }

        Ok(decode_reading(bits))
    }
}
