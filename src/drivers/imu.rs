// MotionLink — ICM-20608 IMU Driver
//
// Register-level driver; the MPU-6050 shares the register map and is accepted
// too. The driver owns its I2C bus, so there is no global device handle.

use anyhow::bail;
use esp_idf_hal::i2c::I2cDriver;

use crate::config::*;
use crate::drivers::MotionSensor;

// Register addresses (ICM-20608 / MPU-6050)
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_XOUT_H: u8 = 0x43;
const REG_WHO_AM_I: u8 = 0x75;

const WHO_AM_I_ICM20608G: u8 = 0xAF;
const WHO_AM_I_ICM20608D: u8 = 0xAE;
const WHO_AM_I_MPU6050: u8 = 0x68;

pub struct Imu {
    bus: I2cDriver<'static>,
}

impl Imu {
    /// Identify the device, wake it and select ±2 g / ±250 °/s full scale.
    pub fn init(bus: I2cDriver<'static>) -> anyhow::Result<Self> {
        let mut imu = Self { bus };

        let mut id = [0u8; 1];
        imu.bus
            .write_read(I2C_ADDR_IMU, &[REG_WHO_AM_I], &mut id, I2C_TIMEOUT_TICKS)?;
        match id[0] {
            WHO_AM_I_ICM20608G | WHO_AM_I_ICM20608D | WHO_AM_I_MPU6050 => {}
            other => bail!("unexpected WHO_AM_I 0x{:02X}", other),
        }

        // Wake up, PLL clock source
        imu.write_reg(REG_PWR_MGMT_1, 0x01)?;
        // Gyroscope: ±250 °/s
        imu.write_reg(REG_GYRO_CONFIG, 0x00)?;
        // Accelerometer: ±2 g
        imu.write_reg(REG_ACCEL_CONFIG, 0x00)?;

        log::info!("IMU initialised (WHO_AM_I 0x{:02X}, ±2g, ±250°/s)", id[0]);
        Ok(imu)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> anyhow::Result<()> {
        self.bus.write(I2C_ADDR_IMU, &[reg, value], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }

    /// Burst-read three big-endian axes starting at `reg`.
    fn read_axes(&mut self, reg: u8) -> anyhow::Result<[i16; 3]> {
        let mut raw = [0u8; 6];
        self.bus
            .write_read(I2C_ADDR_IMU, &[reg], &mut raw, I2C_TIMEOUT_TICKS)?;
        Ok([
            i16::from_be_bytes([raw[0], raw[1]]),
            i16::from_be_bytes([raw[2], raw[3]]),
            i16::from_be_bytes([raw[4], raw[5]]),
        ])
    }
}

impl MotionSensor for Imu {
    fn read_accel(&mut self) -> anyhow::Result<[i16; 3]> {
        self.read_axes(REG_ACCEL_XOUT_H)
    }

    fn read_gyro(&mut self) -> anyhow::Result<[i16; 3]> {
        self.read_axes(REG_GYRO_XOUT_H)
    }
}
