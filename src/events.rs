// MotionLink — Sensor Data Types

// ---------------------------------------------------------------------------
// Raw 6-axis register reading (accelerometer + gyroscope)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawReading {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

// ---------------------------------------------------------------------------
// Sample sent upstream, one per attempt
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    /// Activity tag the collection endpoint files the reading under.
    pub label: String,
}

impl SensorSample {
    /// Widen raw register counts to floats. No unit conversion or calibration
    /// is applied; the endpoint expects raw counts.
    pub fn from_raw(raw: RawReading, label: impl Into<String>) -> Self {
        let [ax, ay, az] = raw.accel;
        let [gx, gy, gz] = raw.gyro;
        Self {
            ax: ax as f32,
            ay: ay as f32,
            az: az as f32,
            gx: gx as f32,
            gy: gy as f32,
            gz: gz as f32,
            label: label.into(),
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.ax, self.ay, self.az, self.gx, self.gy, self.gz]
            .iter()
            .all(|v| v.is_finite())
    }
}
