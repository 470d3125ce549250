//! Sample aggregation and accelerometer/magnetometer orientation.
//!
//! [`Aggregator::tick`] is meant to be called from a single control loop much
//! faster than the barometer's cycle. Motion fields of a [`FusedSample`] are
//! always from the same tick; pressure and temperature carry over from the
//! last completed barometer cycle and may lag by up to one cycle.
//!
//! The aggregator is not shareable between execution contexts. When ticking
//! and reading happen in different tasks, publish copies of
//! [`Aggregator::latest`] through a channel or a mutex instead.

use core::f32::consts::TAU;

use libm::{atan2f, cosf, sinf};

use crate::baro::{Measurement, PressureSensor};
use crate::buffer::DoubleBuffer;
use crate::bus::BusTransport;
use crate::error::Error;
use crate::motion::{InertialSensor, Magnetometer, Triple};
use crate::time::{MonotonicMicros, elapsed};

/// Time stamped bundle of the latest readings from every sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FusedSample {
    pub accel: Triple,
    pub gyro: Triple,
    pub mag: Triple,
    /// Compensated temperature, 0.1 °C.
    pub temperature: i32,
    /// Compensated pressure, Pa.
    pub pressure: i32,
    pub timestamp_micros: MonotonicMicros,
    /// When `temperature`/`pressure` were produced; `None` until the first cycle completes.
    pub pressure_timestamp_micros: Option<MonotonicMicros>,
}

impl FusedSample {
    /// Age of the pressure/temperature fields at `now`.
    pub fn pressure_age(&self, now: MonotonicMicros) -> Option<u32> {
        self.pressure_timestamp_micros.map(|t| elapsed(now, t))
    }
}

/// Roll, pitch and heading in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    /// Tilt-compensated heading plus declination, in `[0, 2π)`.
    pub heading: f32,
}

/// What one [`Aggregator::tick`] produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Motion fields refreshed; pressure carried over.
    MotionOnly,
    /// Motion fields refreshed and a new pressure/temperature pair landed.
    PressureUpdated,
}

/// Drives the three sensors once per tick and keeps the last two samples.
pub struct Aggregator<'a, B, I, M> {
    pressure: &'a mut PressureSensor<B>,
    inertial: &'a mut I,
    magnetometer: &'a mut M,
    samples: DoubleBuffer<FusedSample>,
    declination: f32,
}

impl<'a, B, I, M> Aggregator<'a, B, I, M>
where
    B: BusTransport,
    I: InertialSensor,
    M: Magnetometer,
{
    /// `declination` is the local magnetic declination in radians.
    pub fn new(
        pressure: &'a mut PressureSensor<B>,
        inertial: &'a mut I,
        magnetometer: &'a mut M,
        declination: f32,
    ) -> Self {
        Self {
            pressure,
            inertial,
            magnetometer,
            samples: DoubleBuffer::new(FusedSample::default()),
            declination,
        }
    }

    /// Polls the barometer, reads motion and magnetometer, and publishes one sample.
    ///
    /// A sample is published on every call. When the barometer fails, pressure and
    /// temperature carry over and the error is returned after publishing.
    pub fn tick(&mut self, now: MonotonicMicros) -> Result<TickOutcome, Error> {
        let measurement = self.poll_pressure(now);
        let motion = self.inertial.read_raw_motion();
        let mag = self.magnetometer.read_raw_triple();

        let mut sample = self.samples.write();
        sample.accel = motion.accel;
        sample.gyro = motion.gyro;
        sample.mag = mag;
        sample.timestamp_micros = now;
        if let Ok(Some(m)) = measurement {
            sample.temperature = m.temperature_deci_celsius;
            sample.pressure = m.pressure_pa;
            sample.pressure_timestamp_micros = Some(now);
        }
        sample.commit();

        Ok(match measurement? {
            Some(_) => TickOutcome::PressureUpdated,
            None => TickOutcome::MotionOnly,
        })
    }

    fn poll_pressure(&mut self, now: MonotonicMicros) -> Result<Option<Measurement>, Error> {
        let Some(raw) = self.pressure.poll(now)?.sample() else {
            return Ok(None);
        };
        let measurement = self.pressure.compensate(raw).inspect_err(|_e| {
            #[cfg(feature = "defmt")]
            defmt::warn!("baro compensation failed: {}", _e);
        })?;
        Ok(Some(measurement))
    }

    /// The most recently published sample.
    pub fn latest(&self) -> FusedSample {
        self.samples.latest()
    }

    /// Orientation of the latest sample with an explicit declination.
    pub fn compute_orientation(&self, declination: f32) -> Orientation {
        orientation_of(&self.samples.read_latest(), declination)
    }

    /// Orientation of the latest sample with the configured declination.
    pub fn orientation(&self) -> Orientation {
        self.compute_orientation(self.declination)
    }

    /// `true` when pressure has never been measured or is older than `limit` micros.
    pub fn pressure_is_stale(&self, now: MonotonicMicros, limit: u32) -> bool {
        self.latest().pressure_age(now).is_none_or(|age| age > limit)
    }

    pub fn declination(&self) -> f32 {
        self.declination
    }
}

/// Roll and pitch from gravity, heading from the tilt-compensated magnetometer.
pub fn orientation_of(sample: &FusedSample, declination: f32) -> Orientation {
    let (ax, ay, az) = (
        f32::from(sample.accel.x),
        f32::from(sample.accel.y),
        f32::from(sample.accel.z),
    );
    let (mx, my, mz) = (
        f32::from(sample.mag.x),
        f32::from(sample.mag.y),
        f32::from(sample.mag.z),
    );

    let roll = atan2f(ay, az);
    let pitch = atan2f(ax, az);
    let (sin_roll, cos_roll) = (sinf(roll), cosf(roll));
    let (sin_pitch, cos_pitch) = (sinf(pitch), cosf(pitch));

    let xh = mx * cos_pitch - mz * sin_pitch;
    let yh = mx * sin_roll * sin_pitch + my * cos_roll + mz * sin_roll * cos_pitch;

    Orientation {
        roll,
        pitch,
        heading: normalize_heading(atan2f(yh, xh) + declination),
    }
}

/// Brings a heading at most one turn out of range back into `[0, 2π)`.
pub fn normalize_heading(heading: f32) -> f32 {
    let turned = if heading < 0.0 {
        heading + TAU
    } else if heading >= TAU {
        heading - TAU
    } else {
        heading
    };
    // A tiny negative heading plus one turn rounds up to exactly 2π.
    if turned >= TAU { 0.0 } else { turned }
}
