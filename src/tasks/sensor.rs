// MotionLink — Sensor Task
//
// Reads the 6-axis IMU once per interval and uploads each reading. Failed
// uploads are logged and dropped; the next cycle runs regardless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::drivers::MotionSensor;
use crate::events::SensorSample;
use crate::upload::{UploadOutcome, Uplink};

/// One read-and-upload cycle. `None` when the sensor could not be read.
pub fn sample_once<S, U>(sensor: &mut S, uplink: &U, label: &str) -> Option<UploadOutcome>
where
    S: MotionSensor + ?Sized,
    U: Uplink + ?Sized,
{
    let raw = match sensor.read_raw() {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("IMU read error: {}", e);
            return None;
        }
    };

    log::info!("--- Sensor Reading ---");
    log::info!("Accel: x={}, y={}, z={}", raw.accel[0], raw.accel[1], raw.accel[2]);
    log::info!("Gyro: x={}, y={}, z={}", raw.gyro[0], raw.gyro[1], raw.gyro[2]);

    let outcome = uplink.upload(SensorSample::from_raw(raw, label));
    match &outcome {
        UploadOutcome::Delivered { .. } => log::info!("{}", outcome),
        UploadOutcome::DeliveredNon2xx { .. } => log::warn!("{}", outcome),
        UploadOutcome::Failed(_) => log::error!("{}", outcome),
    }
    Some(outcome)
}

/// Sensor task body. `init` runs once; if it fails only this task stops.
pub fn sensor_task<S, F, U>(init: F, uplink: U, label: String, interval: Duration, stop: Arc<AtomicBool>)
where
    S: MotionSensor,
    F: FnOnce() -> anyhow::Result<S>,
    U: Uplink,
{
    log::info!("Sensor task started");

    let mut sensor = match init() {
        Ok(sensor) => sensor,
        Err(e) => {
            log::error!("Sensor init failed: {:#}", e);
            return;
        }
    };

    while !stop.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        sample_once(&mut sensor, &uplink, &label);

        // Sleep for the remainder of the interval; an upload that overran it
        // starts the next cycle immediately.
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::info!("Sensor task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use anyhow::anyhow;

    use crate::upload::FailureReason;

    struct FakeImu {
        reads: u32,
        fail_every: Option<u32>,
    }

    impl MotionSensor for FakeImu {
        fn read_accel(&mut self) -> anyhow::Result<[i16; 3]> {
            self.reads += 1;
            match self.fail_every {
                Some(n) if self.reads % n == 0 => Err(anyhow!("i2c nack")),
                _ => Ok([100, -200, 16384]),
            }
        }

        fn read_gyro(&mut self) -> anyhow::Result<[i16; 3]> {
            Ok([1, 2, -3])
        }
    }

    struct RecordingUplink {
        samples: RefCell<Vec<SensorSample>>,
        outcome: UploadOutcome,
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl RecordingUplink {
        fn new(outcome: UploadOutcome) -> Self {
            Self {
                samples: RefCell::new(Vec::new()),
                outcome,
                stop_after: None,
            }
        }
    }

    impl Uplink for RecordingUplink {
        fn upload(&self, sample: SensorSample) -> UploadOutcome {
            self.samples.borrow_mut().push(sample);
            if let Some((n, stop)) = &self.stop_after {
                if self.samples.borrow().len() >= *n {
                    stop.store(true, Ordering::SeqCst);
                }
            }
            self.outcome.clone()
        }
    }

    #[test]
    fn test_sample_once_uploads_raw_counts() {
        let mut imu = FakeImu {
            reads: 0,
            fail_every: None,
        };
        let uplink = RecordingUplink::new(UploadOutcome::Delivered { status: 200 });

        let outcome = sample_once(&mut imu, &uplink, "walking");
        assert_eq!(outcome, Some(UploadOutcome::Delivered { status: 200 }));

        let samples = uplink.samples.borrow();
        assert_eq!(samples.len(), 1);
        assert_eq!((samples[0].ax, samples[0].ay, samples[0].az), (100.0, -200.0, 16384.0));
        assert_eq!((samples[0].gx, samples[0].gy, samples[0].gz), (1.0, 2.0, -3.0));
        assert_eq!(samples[0].label, "walking");
    }

    #[test]
    fn test_read_error_skips_upload() {
        let mut imu = FakeImu {
            reads: 0,
            fail_every: Some(1),
        };
        let uplink = RecordingUplink::new(UploadOutcome::Delivered { status: 200 });
        assert_eq!(sample_once(&mut imu, &uplink, "walking"), None);
        assert!(uplink.samples.borrow().is_empty());
    }

    #[test]
    fn test_task_keeps_going_after_failures() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut uplink = RecordingUplink::new(UploadOutcome::Failed(FailureReason::ConnectFailed));
        uplink.stop_after = Some((3, Arc::clone(&stop)));

        sensor_task(
            || {
                Ok(FakeImu {
                    reads: 0,
                    fail_every: Some(2),
                })
            },
            &uplink,
            "walking".to_string(),
            Duration::from_millis(1),
            stop,
        );

        // Every second read fails, so five cycles yield three uploads.
        assert_eq!(uplink.samples.borrow().len(), 3);
    }

    #[test]
    fn test_init_failure_stops_only_the_task() {
        let uplink = RecordingUplink::new(UploadOutcome::Delivered { status: 200 });
        sensor_task(
            || -> anyhow::Result<FakeImu> { Err(anyhow!("ICM20608 not found")) },
            &uplink,
            "walking".to_string(),
            Duration::from_millis(1),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(uplink.samples.borrow().is_empty());
    }
}
