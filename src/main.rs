#![no_std]
#![no_main]

use core::cell::{Cell, RefCell};

use defmt::*;
use embassy_executor::{Spawner, task};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_stm32::time::Hertz;
use embassy_time::{Duration, Instant, Ticker, Timer, WithTimeout};
use embassy_sync::{
    blocking_mutex::{Mutex, raw::ThreadModeRawMutex},
    channel::Channel,
};
use embedded_hal_bus::i2c::RefCellDevice;
use heapless::Deque;
use avionics_sensor_fusion::*;
use {defmt_rtt as _, panic_probe as _};

/// Magnetic declination at the launch site, radians (about 4.5° W).
const DECLINATION_RAD: f32 = -0.0785;
/// Raw gyro drift of the flight board at the default ±250 °/s range.
const GYRO_BIAS: Triple = Triple::new(450, -940, 250);
/// Consecutive failed barometer polls before its cycle is restarted.
const BARO_WATCHDOG_LIMIT: u8 = 8;
/// Forward every Nth fused sample to the logger.
const LOG_DECIMATION: u32 = 50;

static SAMPLE_CHANNEL: Channel<ThreadModeRawMutex, FusedSample, 4> = Channel::new(); // decimated fused samples to send to log task
static ALT_CHANNEL: Channel<ThreadModeRawMutex, f32, 4> = Channel::new(); // filtered altitude to send to control task
static ORIENTATION: Mutex<ThreadModeRawMutex, Cell<Orientation>> = Mutex::new(Cell::new(Orientation {
    roll: 0.0,
    pitch: 0.0,
    heading: 0.0,
})); // latest orientation, read by control task

struct UptimeClock;

impl Clock for UptimeClock {
    fn now_micros(&self) -> MonotonicMicros {
        // Truncation wraps every ~71 minutes; the state machine handles it.
        Instant::now().as_micros() as u32
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    info!("Hello World!");

    let led = Output::new(p.PB7, Level::High, Speed::Low);
    let i2c = I2c::new_blocking(p.I2C1, p.PB8, p.PB9, Hertz(400_000), Default::default());

    _spawner.spawn(control_task(led)).unwrap();
    _spawner.spawn(sensor_task(i2c)).unwrap();
    _spawner.spawn(log_task()).unwrap();

    info!("All tasks spawned");
}


#[task]
async fn control_task(mut led: Output<'static>) {

    info!("Starting main control loop");

    loop {
        // do control stuff here

        // blink led to show alive
        led.toggle();

        if let Ok(alt) = ALT_CHANNEL.try_receive() {
            info!("Current altitude: {} m", alt);
        }

        let o = ORIENTATION.lock(|o| o.get());
        info!(
            "roll: {} deg, pitch: {} deg, heading: {} deg",
            o.roll.to_degrees(),
            o.pitch.to_degrees(),
            o.heading.to_degrees()
        );

        Timer::after(Duration::from_millis(100)).await;
    }

}

// sensor acquisition and fusion task
// owns the shared i2c bus, ticks the aggregator every millisecond so the barometer
// state machine never waits on a conversion
// sends filtered altitude to control task whenever a pressure cycle completes
// sends decimated fused samples to logging task
#[task]
async fn sensor_task(i2c: I2c<'static, Blocking>) {
    info!("Starting sensor task");

    let bus = RefCell::new(i2c);
    let clock = UptimeClock;

    let mut baro = PressureSensor::new(
        I2cBus::new(RefCellDevice::new(&bus)),
        BaroConfig::new()
            .with_oversampling(Oversampling::Standard)
            .with_watchdog_limit(BARO_WATCHDOG_LIMIT),
    );
    let mut imu = Mpu6050::new(
        I2cBus::new(RefCellDevice::new(&bus)),
        Mpu6050Config::new().with_gyro_bias(GYRO_BIAS),
    );
    let mut compass = Hmc5883l::new(I2cBus::new(RefCellDevice::new(&bus)), Hmc5883lConfig::new());

    // calibration is re-read on every boot
    if let Err(e) = baro.initialize(clock.now_micros()) {
        error!("barometer init failed: {}", e);
        return;
    }

    let mut aggregator = Aggregator::new(&mut baro, &mut imu, &mut compass, DECLINATION_RAD);

    // altitude filter buffer, rolling average over the last 10 pressure cycles
    let mut alt_buffer: Deque<f32, 10> = Deque::new();
    let mut ticks: u32 = 0;
    let mut ticker = Ticker::every(Duration::from_millis(1));

    loop {
        ticker.next().await;

        match aggregator.tick(clock.now_micros()) {
            Ok(TickOutcome::PressureUpdated) => {
                let sample = aggregator.latest();
                let measurement = Measurement {
                    temperature_deci_celsius: sample.temperature,
                    pressure_pa: sample.pressure,
                };

                if alt_buffer.is_full() {
                    alt_buffer.pop_front();
                }
                alt_buffer.push_back(measurement.altitude_m(SEA_LEVEL_PA as f32)).ok();
                let alt_sum: f32 = alt_buffer.iter().sum();
                let alt_avg = alt_sum / alt_buffer.len() as f32;

                // try sending filtered altitude, if channel is full, flush it and send again
                if ALT_CHANNEL.try_send(alt_avg).is_err() {
                    warn!("alt channel full, flushing data");
                    ALT_CHANNEL.clear();
                    ALT_CHANNEL.send(alt_avg).with_timeout(Duration::from_millis(1)).await.ok();
                }
            }
            Ok(TickOutcome::MotionOnly) => {}
            // motion was still published, only pressure is stale
            Err(e) => {
                warn!("barometer failed this tick: {}", e);
            }
        }

        ORIENTATION.lock(|o| o.set(aggregator.orientation()));

        ticks = ticks.wrapping_add(1);
        if ticks % LOG_DECIMATION == 0 {
            let sample = aggregator.latest();
            if SAMPLE_CHANNEL.try_send(sample).is_err() {
                warn!("sample channel full, flushing data");
                SAMPLE_CHANNEL.clear();
                SAMPLE_CHANNEL.send(sample).with_timeout(Duration::from_millis(1)).await.ok();
            }
        }
    }
}

// receives decimated fused samples and logs them with a running count
#[task]
async fn log_task() {
    info!("Entered logging task");

    let mut logged: u32 = 0;

    loop {
        while let Ok(sample) = SAMPLE_CHANNEL.try_receive() {
            logged = logged.wrapping_add(1);
            info!("sample {}: {}", logged, sample);
        }

        // wait state to let other tasks run
        Timer::after(Duration::from_millis(50)).await;
    }
}
