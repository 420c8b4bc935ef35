// MotionLink — Device drivers

#[cfg(target_os = "espidf")]
pub mod imu;

use crate::events::RawReading;

/// Raw 6-axis motion source. Readings are register counts, unconverted.
pub trait MotionSensor {
    fn read_accel(&mut self) -> anyhow::Result<[i16; 3]>;

    fn read_gyro(&mut self) -> anyhow::Result<[i16; 3]>;

    fn read_raw(&mut self) -> anyhow::Result<RawReading> {
        Ok(RawReading {
            accel: self.read_accel()?,
            gyro: self.read_gyro()?,
        })
    }
}
