//! BMP085 barometer with a non-blocking acquisition state machine.
//!
//! One acquisition cycle is two conversions: temperature, then pressure.
//! Each conversion is started by a command write and read back once its
//! settle time has elapsed. [`PressureSensor::poll`] checks the current
//! phase against the clock and returns immediately, so it can be called from
//! a fast control loop without ever waiting on the sensor.

mod calibration;
mod compensation;
mod config;
mod register;

pub use calibration::CalibrationSet;
pub use compensation::{Measurement, RawPressureSample, SEA_LEVEL_PA, compensate};
pub use config::{BaroConfig, Oversampling};

use calibration::CALIBRATION_LEN;

use crate::bus::BusTransport;
use crate::error::{BusError, DomainError};
use crate::time::{MonotonicMicros, elapsed};

/// Phase of the acquisition cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionState {
    /// No conversion in flight; the next poll starts a new cycle.
    #[default]
    Idle,
    /// Temperature conversion started, waiting for it to settle.
    AwaitingTemperatureConversion,
    /// Pressure conversion started, waiting for it to settle.
    AwaitingPressureConversion,
}

/// Outcome of one [`PressureSensor::poll`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollResult {
    /// No sample completed; the machine is in the contained state.
    Waiting(AcquisitionState),
    /// The pressure conversion completed in this call and the machine is idle again.
    SampleReady(RawPressureSample),
}

impl PollResult {
    /// State of the machine after the call.
    pub const fn state(&self) -> AcquisitionState {
        match self {
            PollResult::Waiting(state) => *state,
            PollResult::SampleReady(_) => AcquisitionState::Idle,
        }
    }

    /// The completed sample, if this call finished a cycle.
    pub const fn sample(&self) -> Option<RawPressureSample> {
        match self {
            PollResult::Waiting(_) => None,
            PollResult::SampleReady(sample) => Some(*sample),
        }
    }
}

/// BMP085-class pressure sensor.
pub struct PressureSensor<B> {
    bus: B,
    config: BaroConfig,
    calibration: CalibrationSet,
    state: AcquisitionState,
    phase_start: MonotonicMicros,
    raw: RawPressureSample,
    pending_oversampling: Option<Oversampling>,
    failed_polls: u8,
}

impl<B: BusTransport> PressureSensor<B> {
    /// Creates a driver; call [`initialize`](Self::initialize) before polling.
    pub const fn new(bus: B, config: BaroConfig) -> Self {
        Self {
            bus,
            config,
            calibration: CalibrationSet {
                ac1: 0,
                ac2: 0,
                ac3: 0,
                ac4: 0,
                ac5: 0,
                ac6: 0,
                b1: 0,
                b2: 0,
                mb: 0,
                mc: 0,
                md: 0,
            },
            state: AcquisitionState::Idle,
            phase_start: 0,
            raw: RawPressureSample {
                uncompensated_temperature: 0,
                uncompensated_pressure: 0,
            },
            pending_oversampling: None,
            failed_polls: 0,
        }
    }

    /// Reads the factory calibration and takes `now` as the phase reference.
    pub fn initialize(&mut self, now: MonotonicMicros) -> Result<(), BusError> {
        let mut buffer = [0u8; CALIBRATION_LEN];
        self.bus
            .read_exact(self.config.address, register::CALIBRATION, &mut buffer)?;
        self.calibration = CalibrationSet::from_bytes(&buffer);
        self.state = AcquisitionState::Idle;
        self.phase_start = now;
        self.failed_polls = 0;

        #[cfg(feature = "defmt")]
        defmt::debug!("baro calibration: {}", self.calibration);

        Ok(())
    }

    /// Advances the acquisition cycle by at most one phase.
    ///
    /// A bus failure leaves the machine in the phase it was attempting; the
    /// next poll retries it. With a watchdog limit configured, that many
    /// consecutive failures restart the cycle from [`AcquisitionState::Idle`].
    pub fn poll(&mut self, now: MonotonicMicros) -> Result<PollResult, BusError> {
        match self.step(now) {
            Ok(result) => {
                self.failed_polls = 0;
                Ok(result)
            }
            Err(e) => {
                self.record_failure(e);
                Err(e)
            }
        }
    }

    fn step(&mut self, now: MonotonicMicros) -> Result<PollResult, BusError> {
        match self.state {
            AcquisitionState::Idle => {
                if let Some(oversampling) = self.pending_oversampling.take() {
                    self.config.oversampling = oversampling;
                }
                self.start_temperature(now)?;
                Ok(PollResult::Waiting(self.state))
            }
            AcquisitionState::AwaitingTemperatureConversion => {
                if elapsed(now, self.phase_start) < register::TEMPERATURE_WAIT_MICROS {
                    return Ok(PollResult::Waiting(self.state));
                }
                self.read_temperature()?;
                self.start_pressure(now)?;
                Ok(PollResult::Waiting(self.state))
            }
            AcquisitionState::AwaitingPressureConversion => {
                if elapsed(now, self.phase_start) < self.config.oversampling.wait_micros() {
                    return Ok(PollResult::Waiting(self.state));
                }
                self.read_pressure()?;
                self.enter(AcquisitionState::Idle, now);
                Ok(PollResult::SampleReady(self.raw))
            }
        }
    }

    fn start_temperature(&mut self, now: MonotonicMicros) -> Result<(), BusError> {
        self.bus.write(
            self.config.address,
            register::CONTROL,
            register::CMD_TEMPERATURE,
        )?;
        self.enter(AcquisitionState::AwaitingTemperatureConversion, now);
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<(), BusError> {
        let mut buffer = [0u8; 2];
        self.bus
            .read_exact(self.config.address, register::DATA, &mut buffer)?;
        self.raw.uncompensated_temperature = i32::from(u16::from_be_bytes(buffer));
        Ok(())
    }

    fn start_pressure(&mut self, now: MonotonicMicros) -> Result<(), BusError> {
        self.bus.write(
            self.config.address,
            register::CONTROL,
            self.config.oversampling.command(),
        )?;
        self.enter(AcquisitionState::AwaitingPressureConversion, now);
        Ok(())
    }

    fn read_pressure(&mut self) -> Result<(), BusError> {
        let mut buffer = [0u8; 3];
        self.bus
            .read_exact(self.config.address, register::DATA, &mut buffer)?;
        let counts =
            (i32::from(buffer[0]) << 16) | (i32::from(buffer[1]) << 8) | i32::from(buffer[2]);
        self.raw.uncompensated_pressure = counts >> self.config.oversampling.shift();
        Ok(())
    }

    fn enter(&mut self, state: AcquisitionState, now: MonotonicMicros) {
        #[cfg(feature = "defmt")]
        defmt::trace!("baro {} -> {} at {}us", self.state, state, now);

        self.state = state;
        self.phase_start = now;
    }

    fn record_failure(&mut self, _error: BusError) {
        #[cfg(feature = "defmt")]
        defmt::warn!("baro bus error in {}: {}", self.state, _error);

        self.failed_polls = self.failed_polls.saturating_add(1);
        if let Some(limit) = self.config.watchdog_limit {
            if self.failed_polls >= limit {
                #[cfg(feature = "defmt")]
                defmt::warn!("baro watchdog: {} failed polls, restarting cycle", self.failed_polls);

                self.reset();
            }
        }
    }

    /// Abandons any conversion in flight; the next poll starts a fresh cycle.
    pub fn reset(&mut self) {
        self.state = AcquisitionState::Idle;
        self.failed_polls = 0;
    }

    /// Compensates a raw sample with this sensor's calibration and oversampling.
    pub fn compensate(&self, raw: RawPressureSample) -> Result<Measurement, DomainError> {
        compensate(&self.calibration, self.config.oversampling, raw)
    }

    /// Changes the oversampling at the start of the next cycle.
    ///
    /// A conversion already in flight finishes with the old setting.
    pub fn request_oversampling(&mut self, oversampling: Oversampling) {
        self.pending_oversampling = Some(oversampling);
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn oversampling(&self) -> Oversampling {
        self.config.oversampling
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    /// Direct access to the bus; the acquisition state is not affected.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Releases the underlying bus.
    pub fn release(self) -> B {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DATASHEET_CAL, MockBus, datasheet_calibration_bytes};

    const ADDR: u8 = 0x77;

    fn initialized(config: BaroConfig) -> PressureSensor<MockBus> {
        let mut bus = MockBus::default();
        for (offset, byte) in datasheet_calibration_bytes().iter().enumerate() {
            bus.set_reg(ADDR, register::CALIBRATION + offset as u8, *byte);
        }
        let mut sensor = PressureSensor::new(bus, config);
        sensor.initialize(0).expect("initialize");
        sensor
    }

    fn set_data(sensor: &mut PressureSensor<MockBus>, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            sensor.bus.set_reg(ADDR, register::DATA + offset as u8, *byte);
        }
    }

    #[test]
    fn initialize_reads_calibration() {
        let sensor = initialized(BaroConfig::new());
        assert_eq!(*sensor.calibration(), DATASHEET_CAL);
        assert_eq!(sensor.state(), AcquisitionState::Idle);
        assert_eq!(sensor.bus.reads(), [(ADDR, register::CALIBRATION, 22)]);
    }

    #[test]
    fn initialize_fails_on_short_read() {
        let bus = MockBus::default().with_short_reads(1);
        let mut sensor = PressureSensor::new(bus, BaroConfig::new());
        assert_eq!(
            sensor.initialize(0),
            Err(BusError::ShortRead {
                expected: 22,
                received: 21
            })
        );
    }

    #[test]
    fn cycle_visits_states_in_order_and_respects_deadlines() {
        let config = BaroConfig::new().with_oversampling(Oversampling::Standard);
        let mut sensor = initialized(config);

        // Idle -> temperature conversion started at t = 1000.
        let r = sensor.poll(1_000).expect("poll");
        assert_eq!(r, PollResult::Waiting(AcquisitionState::AwaitingTemperatureConversion));
        assert_eq!(
            sensor.bus.writes().last(),
            Some(&(ADDR, register::CONTROL, register::CMD_TEMPERATURE))
        );

        // One microsecond before the 4.5 ms deadline nothing happens.
        let r = sensor.poll(1_000 + 4_499).expect("poll");
        assert_eq!(r.state(), AcquisitionState::AwaitingTemperatureConversion);

        set_data(&mut sensor, &27898u16.to_be_bytes());
        let r = sensor.poll(1_000 + 4_500).expect("poll");
        assert_eq!(r, PollResult::Waiting(AcquisitionState::AwaitingPressureConversion));
        assert_eq!(
            sensor.bus.writes().last(),
            Some(&(ADDR, register::CONTROL, Oversampling::Standard.command()))
        );

        let pressure_start = 5_500;
        let r = sensor.poll(pressure_start + 7_499).expect("poll");
        assert_eq!(r.state(), AcquisitionState::AwaitingPressureConversion);

        // 23843 << (8 - 1)
        let counts: u32 = 23843 << 7;
        let bytes = counts.to_be_bytes();
        set_data(&mut sensor, &bytes[1..]);
        let r = sensor.poll(pressure_start + 7_500).expect("poll");
        assert_eq!(
            r,
            PollResult::SampleReady(RawPressureSample {
                uncompensated_temperature: 27898,
                uncompensated_pressure: 23843,
            })
        );
        assert_eq!(r.state(), AcquisitionState::Idle);

        // Next poll starts a new cycle.
        let r = sensor.poll(pressure_start + 7_501).expect("poll");
        assert_eq!(r.state(), AcquisitionState::AwaitingTemperatureConversion);
    }

    #[test]
    fn tight_loop_completes_one_cycle_per_period() {
        let mut sensor = initialized(BaroConfig::new());
        set_data(&mut sensor, &[0x6C, 0xFA, 0x00]);

        let mut transitions = 0;
        let mut samples = 0;
        let mut last = sensor.state();
        for now in (0..30_000u32).step_by(100) {
            let r = sensor.poll(now).expect("poll");
            if r.sample().is_some() {
                samples += 1;
            }
            if r.state() != last {
                transitions += 1;
                last = r.state();
            }
        }
        // Cycle: 0 start temp, 4500 start pressure, 9000 done, 9100 restart...
        assert_eq!(samples, 3);
        assert!(transitions >= 9);
    }

    #[test]
    fn deadline_holds_across_clock_wrap() {
        let mut sensor = initialized(BaroConfig::new());
        let start = u32::MAX - 1_000;
        sensor.poll(start).expect("poll");
        let r = sensor.poll(3_000).expect("poll");
        assert_eq!(r.state(), AcquisitionState::AwaitingTemperatureConversion);
        let r = sensor.poll(3_500).expect("poll");
        assert_eq!(r.state(), AcquisitionState::AwaitingPressureConversion);
    }

    #[test]
    fn failed_read_parks_in_current_phase() {
        let mut sensor = initialized(BaroConfig::new());
        sensor.poll(0).expect("poll");
        sensor.bus.fail_next(1);
        assert_eq!(sensor.poll(5_000), Err(BusError::Transport));
        assert_eq!(sensor.state(), AcquisitionState::AwaitingTemperatureConversion);

        let r = sensor.poll(5_100).expect("poll");
        assert_eq!(r.state(), AcquisitionState::AwaitingPressureConversion);
    }

    #[test]
    fn watchdog_restarts_cycle_after_limit() {
        let mut sensor = initialized(BaroConfig::new().with_watchdog_limit(2));
        sensor.poll(0).expect("poll");
        sensor.bus.fail_next(2);
        assert!(sensor.poll(5_000).is_err());
        assert_eq!(sensor.state(), AcquisitionState::AwaitingTemperatureConversion);
        assert!(sensor.poll(5_100).is_err());
        assert_eq!(sensor.state(), AcquisitionState::Idle);
    }

    #[test]
    fn oversampling_change_is_deferred_to_next_cycle() {
        let mut sensor = initialized(BaroConfig::new());
        sensor.poll(0).expect("poll");
        sensor.request_oversampling(Oversampling::UltraHigh);
        sensor.poll(4_500).expect("poll");
        assert_eq!(sensor.oversampling(), Oversampling::UltraLow);
        assert_eq!(
            sensor.bus.writes().last(),
            Some(&(ADDR, register::CONTROL, Oversampling::UltraLow.command()))
        );

        let r = sensor.poll(9_000).expect("poll");
        assert!(r.sample().is_some());
        sensor.poll(9_100).expect("poll");
        assert_eq!(sensor.oversampling(), Oversampling::UltraHigh);
    }

    #[test]
    fn compensates_with_own_calibration() {
        let sensor = initialized(BaroConfig::new());
        let m = sensor
            .compensate(RawPressureSample {
                uncompensated_temperature: 27898,
                uncompensated_pressure: 23843,
            })
            .expect("compensate");
        assert_eq!(m.temperature_deci_celsius, 150);
        assert_eq!(m.pressure_pa, 69963);
    }
}
