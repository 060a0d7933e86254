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
use crate::config::CalibrationConfig;
use crate::weight::conversion::estimate;
use crate::weight::interface::AsyncStrainGaugeInterface;
use crate::weight::sampler::Sampler;
use crate::weight::{AveragedReading, Error, KnownWeight, ScaleFactor, ZeroOffset};
use embassy_time::{Duration, Timer};

const INPUT_RETRY_DELAY: Duration = Duration::from_millis(100);

const INSTRUCTIONS: [&str; 4] = [
    "=== HX711 calibration ===",
    "1) Empty the platform and send 't' to read the zero offset.",
    "2) With the platform still empty, enter the reference weight in grams.",
    "3) Place the reference weight when prompted; it is read after a short delay.",
];

/// Operator command, one per console line.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Tare,
    SubmitWeight(KnownWeight),
    Invalid,
}

impl Command {
    /// `t`/`T` tares; a finite, positive number submits a reference weight in grams.
    pub fn parse(line: &str) -> Self {
        match line {
            "t" | "T" => Command::Tare,
            _ => match line.parse::<f32>().map(KnownWeight::try_from) {
                Ok(Ok(known_weight)) => Command::SubmitWeight(known_weight),
                _ => Command::Invalid,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationState {
    Idle,
    /// Offset has been read on the empty platform; waiting for the operator to
    /// submit the reference weight. The offset is kept for display only; a
    /// submitted weight always reads a fresh one.
    AwaitingLoad { offset: ZeroOffset },
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationResult {
    pub offset: ZeroOffset,
    pub loaded: AveragedReading,
    pub known_weight: KnownWeight,
    pub factor: ScaleFactor,
}

impl CalibrationResult {
    pub fn net(&self) -> AveragedReading {
        self.loaded.net_of(self.offset)
    }
}

#[derive(Debug, PartialEq)]
enum CalibrationError<StrainGaugeE, IoE> {
    Weighing(Error<StrainGaugeE>),
    Console(ConsoleError<IoE>),
}

impl<StrainGaugeE, IoE> From<Error<StrainGaugeE>> for CalibrationError<StrainGaugeE, IoE> {
    fn from(e: Error<StrainGaugeE>) -> Self {
        CalibrationError::Weighing(e)
    }
}

impl<StrainGaugeE, IoE> From<ConsoleError<IoE>> for CalibrationError<StrainGaugeE, IoE> {
    fn from(e: ConsoleError<IoE>) -> Self {
        CalibrationError::Console(e)
    }
}

/// Interactive calibration over a text console. Derives the scale factor from an
/// empty platform offset and a reading with a reference weight in place.
pub struct CalibrationManager<StrainGauge, IO> {
    sampler: Sampler<StrainGauge>,
    console: Console<IO>,
    config: CalibrationConfig,
    state: CalibrationState,
    last_result: Option<CalibrationResult>,
}

impl<StrainGauge, StrainGaugeE, IO> CalibrationManager<StrainGauge, IO>
where
    StrainGauge: AsyncStrainGaugeInterface<Error = StrainGaugeE>,
    IO: embedded_io_async::Read + embedded_io_async::Write,
{
    pub fn new(sampler: Sampler<StrainGauge>, console: Console<IO>, config: CalibrationConfig) -> Self {
        Self {
            sampler,
            console,
            config,
            state: CalibrationState::Idle,
            last_result: None,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn last_result(&self) -> Option<CalibrationResult> {
        self.last_result
    }

    pub async fn run(&mut self) -> ! {
        if self.console.print_lines(&INSTRUCTIONS).await.is_err() {
            warn!("Unable to print instructions");
        }

        loop {
            if self.step().await.is_err() {
                warn!("Console read or write failed");
                Timer::after(INPUT_RETRY_DELAY).await;
            }
        }
    }

    /// Reads one line from the operator and acts on it.
    pub async fn step(&mut self) -> Result<(), ConsoleError<IO::Error>> {
        let command = match self.console.read_line().await {
            Ok(line) => Command::parse(line),
            Err(ConsoleError::LineTooLong) => Command::Invalid,
            Err(e) => return Err(e),
        };
        self.handle(command).await
    }

    /// Applies `command`. A measurement that fails is reported to the operator and
    /// leaves the state as it was.
    pub async fn handle(&mut self, command: Command) -> Result<(), ConsoleError<IO::Error>> {
        match self.transition(command).await {
            Ok(next_state) => {
                self.state = next_state;
                Ok(())
            }
            Err(CalibrationError::Weighing(Error::SensorTimeout)) => {
                warn!("Calibration aborted, sensor timed out");
                self.console
                    .println(format_args!("Sensor not responding, measurement aborted."))
                    .await
            }
            Err(CalibrationError::Weighing(_)) => {
                warn!("Calibration aborted, sensor read failed");
                self.console
                    .println(format_args!("Sensor read failed, measurement aborted."))
                    .await
            }
            Err(CalibrationError::Console(e)) => Err(e),
        }
    }

    async fn transition(
        &mut self,
        command: Command,
    ) -> Result<CalibrationState, CalibrationError<StrainGaugeE, IO::Error>> {
        match command {
            Command::Tare => {
                let offset = self.measure_offset().await?;
                self.console
                    .println(format_args!("Offset (raw average, empty): {}", offset.counts()))
                    .await?;
                self.console
                    .println(format_args!("Now enter the reference weight in grams."))
                    .await?;
                Ok(CalibrationState::AwaitingLoad { offset })
            }
            Command::SubmitWeight(known_weight) => {
                self.calibrate(known_weight).await?;
                Ok(CalibrationState::Idle)
            }
            Command::Invalid => {
                debug!("Rejected operator input");
                self.console
                    .println(format_args!("Invalid weight. Enter a number of grams."))
                    .await?;
                Ok(self.state)
            }
        }
    }

    async fn measure_offset(&mut self) -> Result<ZeroOffset, CalibrationError<StrainGaugeE, IO::Error>> {
        self.console
            .println(format_args!("Reading offset (empty platform)..."))
            .await?;
        Ok(self.sampler.average(self.config.samples).await?)
    }

    async fn calibrate(
        &mut self,
        known_weight: KnownWeight,
    ) -> Result<(), CalibrationError<StrainGaugeE, IO::Error>> {
        let offset = self.measure_offset().await?;
        self.console
            .println(format_args!("Offset (raw): {}", offset.counts()))
            .await?;

        self.console
            .println(format_args!("Place {} g on the platform now...", known_weight.grams()))
            .await?;
        Timer::after(self.config.settle_delay).await;

        let loaded = self.sampler.average(self.config.samples).await?;
        self.console
            .println(format_args!("Reading with load (raw): {}", loaded.counts()))
            .await?;

        let factor = estimate(offset, loaded, known_weight);
        // recorded before any report line is written
        let result = CalibrationResult {
            offset,
            loaded,
            known_weight,
            factor,
        };
        self.last_result = Some(result);
        self.state = CalibrationState::Idle;
        info!(
            "Calibrated: offset {}, loaded {}, factor {}",
            offset.counts(),
            loaded.counts(),
            factor.counts_per_gram()
        );

        self.console
            .println(format_args!("Net (reading - offset): {}", result.net().counts()))
            .await?;
        self.print_factor(factor).await?;
        self.console.println(format_args!("Done.")).await?;
        Ok(())
    }

    async fn print_factor(&mut self, factor: ScaleFactor) -> Result<(), ConsoleError<IO::Error>> {
        self.console
            .println(format_args!(
                "Calculated calibration factor: {:.6}",
                factor.counts_per_gram()
            ))
            .await?;
        self.console
            .println(format_args!(
                "Copy it into the firmware: const CALIBRATION_FACTOR: f32 = {:.6};",
                factor.counts_per_gram()
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingConfig;
    use crate::testutil::{instant_sampling, ConsoleTranscript, FakeConsole, FakeStrainGauge};
    use core::num::NonZeroUsize;
    use embassy_time::Instant;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;

    const REJECTION: &str = "Invalid weight. Enter a number of grams.";

    fn test_config() -> CalibrationConfig {
        CalibrationConfig {
            samples: NonZeroUsize::new(5).unwrap(),
            settle_delay: Duration::from_ticks(0),
        }
    }

    fn manager(
        samples: &[i32],
        input: &str,
        sampling: SamplingConfig,
    ) -> (
        CalibrationManager<FakeStrainGauge, FakeConsole>,
        ConsoleTranscript,
        Rc<Cell<usize>>,
    ) {
        let gauge = FakeStrainGauge::with_samples(samples);
        let reads = gauge.read_counter();
        let (io, transcript) = FakeConsole::new(input);
        let sampler = block_on(Sampler::new(gauge, sampling)).unwrap();
        let manager = CalibrationManager::new(sampler, Console::new(io), test_config());
        (manager, transcript, reads)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("t"), Command::Tare);
        assert_eq!(Command::parse("T"), Command::Tare);
        assert_eq!(
            Command::parse("1000"),
            Command::SubmitWeight(KnownWeight::try_from(1000.0).unwrap())
        );
        assert_eq!(
            Command::parse("250.5"),
            Command::SubmitWeight(KnownWeight::try_from(250.5).unwrap())
        );
        for invalid in ["0", "-5", "abc", "", "nan", "inf", "tare", "12g"] {
            assert_eq!(Command::parse(invalid), Command::Invalid, "input {invalid:?}");
        }
    }

    #[test]
    fn tare_reads_offset_and_waits_for_load() {
        let (mut manager, transcript, reads) =
            manager(&[100, 102, 98, 100, 100], "t\n", instant_sampling());

        block_on(manager.step()).unwrap();

        assert_eq!(
            manager.state(),
            CalibrationState::AwaitingLoad {
                offset: AveragedReading::new(100)
            }
        );
        assert_eq!(reads.get(), 5);
        assert!(transcript
            .lines()
            .contains(&"Offset (raw average, empty): 100".to_string()));
        assert_eq!(manager.last_result(), None);
    }

    #[test]
    fn submitted_weight_produces_scale_factor() {
        let mut samples = vec![100, 102, 98, 100, 100];
        samples.extend([900, 898, 902, 900, 900]);
        let (mut manager, transcript, reads) = manager(&samples, "1000\n", instant_sampling());

        block_on(manager.step()).unwrap();

        let result = manager.last_result().unwrap();
        assert_eq!(result.offset, AveragedReading::new(100));
        assert_eq!(result.loaded, AveragedReading::new(900));
        assert_eq!(result.net(), AveragedReading::new(800));
        assert_eq!(result.factor, ScaleFactor::new(0.8));
        assert_eq!(manager.state(), CalibrationState::Idle);
        assert_eq!(reads.get(), 10);

        let lines = transcript.lines();
        assert!(lines.contains(&"Net (reading - offset): 800".to_string()));
        assert!(lines.contains(&"Calculated calibration factor: 0.800000".to_string()));
    }

    #[test]
    fn submitting_weight_after_tare_returns_to_idle() {
        let mut samples = vec![50; 5];
        samples.extend([50; 5]);
        samples.extend([450; 5]);
        let (mut manager, _, _) = manager(&samples, "T\n200\n", instant_sampling());

        block_on(manager.step()).unwrap();
        assert!(matches!(manager.state(), CalibrationState::AwaitingLoad { .. }));
        block_on(manager.step()).unwrap();

        assert_eq!(manager.state(), CalibrationState::Idle);
        assert_eq!(manager.last_result().unwrap().factor, ScaleFactor::new(2.0));
    }

    #[test]
    fn tiny_reference_weight_still_completes() {
        let mut samples = vec![100; 5];
        samples.extend([900; 5]);
        let (mut manager, transcript, _) = manager(&samples, "1e-30\n", instant_sampling());

        block_on(manager.step()).unwrap();

        let result = manager.last_result().unwrap();
        assert_eq!(result.known_weight, KnownWeight::try_from(1e-30).unwrap());
        assert_eq!(manager.state(), CalibrationState::Idle);
        let lines = transcript.lines();
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Copy it into the firmware: const CALIBRATION_FACTOR: f32 = 8")));
        assert_eq!(lines.last().unwrap(), "Done.");
    }

    #[test]
    fn widest_factor_fits_on_one_line() {
        let (mut manager, transcript, _) = manager(&[], "", instant_sampling());

        block_on(manager.print_factor(ScaleFactor::new(-f32::MAX))).unwrap();

        let lines = transcript.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(".000000;"));
    }

    #[test]
    fn waits_for_the_load_before_reading_it() {
        let mut samples = vec![100; 5];
        samples.extend([900; 5]);
        let gauge = FakeStrainGauge::with_samples(&samples);
        let read_times = gauge.read_times();
        let (io, _) = FakeConsole::new("1000\n");
        let sampler = block_on(Sampler::new(gauge, instant_sampling())).unwrap();
        let config = CalibrationConfig {
            settle_delay: Duration::from_millis(30),
            ..test_config()
        };
        let mut manager = CalibrationManager::new(sampler, Console::new(io), config);

        let started = Instant::now();
        block_on(manager.step()).unwrap();

        let read_times = read_times.borrow();
        assert_eq!(read_times.len(), 10);
        assert!(read_times[5] - read_times[4] >= Duration::from_millis(30));
        assert!(Instant::now() - started >= Duration::from_millis(30));
    }

    #[test]
    fn reversed_bridge_reports_negative_factor() {
        let mut samples = vec![900; 5];
        samples.extend([100; 5]);
        let (mut manager, _, _) = manager(&samples, "1000\n", instant_sampling());

        block_on(manager.step()).unwrap();

        assert_eq!(manager.last_result().unwrap().factor, ScaleFactor::new(-0.8));
    }

    #[test]
    fn invalid_input_is_rejected_without_sampling() {
        let (mut manager, transcript, reads) =
            manager(&[10, 10, 10, 10, 10], "t\n0\n-5\nabc\n", instant_sampling());
        block_on(manager.step()).unwrap();
        let state_after_tare = manager.state();

        for _ in 0..3 {
            transcript.clear();
            block_on(manager.step()).unwrap();
            assert_eq!(transcript.lines(), vec![REJECTION.to_string()]);
            assert_eq!(manager.state(), state_after_tare);
        }
        assert_eq!(reads.get(), 5);
        assert_eq!(manager.last_result(), None);
    }

    #[test]
    fn over_long_input_is_rejected() {
        let input = format!("{}\n", "1".repeat(64));
        let (mut manager, transcript, reads) = manager(&[], &input, instant_sampling());

        block_on(manager.step()).unwrap();

        assert_eq!(transcript.lines(), vec![REJECTION.to_string()]);
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn sensor_timeout_aborts_without_changing_state() {
        let sampling = SamplingConfig {
            ready_timeout: Duration::from_millis(10),
            ..instant_sampling()
        };
        let (mut manager, transcript, _) = manager(&[], "t\n500\n", sampling);

        block_on(manager.step()).unwrap();
        assert_eq!(manager.state(), CalibrationState::Idle);
        block_on(manager.step()).unwrap();
        assert_eq!(manager.state(), CalibrationState::Idle);
        assert_eq!(manager.last_result(), None);

        let aborted = transcript
            .lines()
            .iter()
            .filter(|l| l.as_str() == "Sensor not responding, measurement aborted.")
            .count();
        assert_eq!(aborted, 2);
    }

    #[test]
    fn end_of_input_is_reported() {
        let (mut manager, _, _) = manager(&[], "", instant_sampling());
        assert_eq!(block_on(manager.step()), Err(ConsoleError::EndOfInput));
    }
}
