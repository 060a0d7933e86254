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

//! Test doubles for the strain gauge, its pins and the console.

use crate::config::SamplingConfig;
use crate::weight::interface::AsyncStrainGaugeInterface;
use core::convert::Infallible;
use embassy_time::{Duration, Instant};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Sampling with no settle delay, so tests only wait on real timeouts.
pub fn instant_sampling() -> SamplingConfig {
    SamplingConfig {
        poll_interval: Duration::from_millis(1),
        ready_timeout: Duration::from_millis(1000),
        inter_sample_delay: Duration::from_ticks(0),
    }
}

/// Strain gauge that hands out a scripted list of samples and is not ready
/// once the list runs out.
pub struct FakeStrainGauge {
    samples: VecDeque<i32>,
    reads: Rc<Cell<usize>>,
    read_times: Rc<RefCell<Vec<Instant>>>,
}

impl FakeStrainGauge {
    pub fn with_samples(samples: &[i32]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            reads: Rc::new(Cell::new(0)),
            read_times: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn disconnected() -> Self {
        Self::with_samples(&[])
    }

    /// Number of conversions clocked out so far. Stays valid after the gauge is moved.
    pub fn read_counter(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }

    /// When each conversion was clocked out, in order.
    pub fn read_times(&self) -> Rc<RefCell<Vec<Instant>>> {
        self.read_times.clone()
    }
}

impl AsyncStrainGaugeInterface for FakeStrainGauge {
    type Error = Infallible;

    async fn initialize(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.samples.is_empty())
    }

    async fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        self.reads.set(self.reads.get() + 1);
        self.read_times.borrow_mut().push(Instant::now());
        Ok(self.samples.pop_front().unwrap_or(0))
    }
}

#[derive(Default)]
struct Hx711Lines {
    pending_bits: VecDeque<bool>,
    clock_high: bool,
    data_high: bool,
    rising_edges: usize,
}

/// Clock and data lines of a simulated HX711. Each rising clock edge shifts the
/// next bit of the loaded conversion onto the data line; once the bits are
/// exhausted the data line idles high (not ready).
#[derive(Clone)]
pub struct FakeHx711Pins {
    lines: Rc<RefCell<Hx711Lines>>,
}

impl FakeHx711Pins {
    pub fn new() -> Self {
        let lines = Hx711Lines {
            data_high: true,
            ..Default::default()
        };
        Self {
            lines: Rc::new(RefCell::new(lines)),
        }
    }

    /// Queues a 24 bit conversion, MSB first, and pulls the data line low.
    pub fn load_conversion(&self, bits: u32) {
        let mut lines = self.lines.borrow_mut();
        lines.pending_bits = (0..24).rev().map(|i| (bits >> i) & 0x1 == 0x1).collect();
        lines.data_high = false;
    }

    pub fn rising_edges(&self) -> usize {
        self.lines.borrow().rising_edges
    }

    /// Clock line state left over from before the driver took the pin.
    pub fn set_clock_high(&self) {
        self.lines.borrow_mut().clock_high = true;
    }

    pub fn clock_is_high(&self) -> bool {
        self.lines.borrow().clock_high
    }

    pub fn clock(&self) -> FakeClockPin {
        FakeClockPin {
            lines: self.lines.clone(),
        }
    }

    pub fn data(&self) -> FakeDataPin {
        FakeDataPin {
            lines: self.lines.clone(),
        }
    }
}

pub struct FakeClockPin {
    lines: Rc<RefCell<Hx711Lines>>,
}

pub struct FakeDataPin {
    lines: Rc<RefCell<Hx711Lines>>,
}

impl embedded_hal::digital::ErrorType for FakeClockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for FakeClockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lines.borrow_mut().clock_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut lines = self.lines.borrow_mut();
        if !lines.clock_high {
            lines.rising_edges += 1;
            lines.data_high = lines.pending_bits.pop_front().unwrap_or(true);
        }
        lines.clock_high = true;
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for FakeDataPin {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for FakeDataPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.lines.borrow().data_high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.lines.borrow().data_high)
    }
}

/// Console fed from a fixed input script. Everything written is captured and
/// can be read back through [`ConsoleTranscript`].
pub struct FakeConsole {
    input: VecDeque<u8>,
    output: Rc<RefCell<Vec<u8>>>,
}

#[derive(Clone)]
pub struct ConsoleTranscript {
    output: Rc<RefCell<Vec<u8>>>,
}

impl ConsoleTranscript {
    pub fn text(&self) -> String {
        String::from_utf8(self.output.borrow().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(String::from).collect()
    }

    pub fn clear(&self) {
        self.output.borrow_mut().clear();
    }
}

impl FakeConsole {
    pub fn new(input: &str) -> (Self, ConsoleTranscript) {
        let output = Rc::new(RefCell::new(Vec::new()));
        let console = Self {
            input: input.bytes().collect(),
            output: output.clone(),
        };
        (console, ConsoleTranscript { output })
    }
}

impl embedded_io_async::ErrorType for FakeConsole {
    type Error = Infallible;
}

impl embedded_io_async::Read for FakeConsole {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io_async::Write for FakeConsole {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
}
