// MotionLink — Telemetry Encoder
//
// Turns a `SensorSample` into the compact JSON object the collection endpoint
// expects: {"ax":..,"ay":..,"az":..,"gx":..,"gy":..,"gz":..,"label":".."}.
// Field names and order are part of the wire format.

use serde::Serialize;

use crate::events::SensorSample;

/// Compact UTF-8 JSON body for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes (what `Content-Length` must carry), not in chars.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EncodedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Declaration order is serialization order.
#[derive(Serialize)]
struct WirePayload<'a> {
    ax: f32,
    ay: f32,
    az: f32,
    gx: f32,
    gy: f32,
    gz: f32,
    label: &'a str,
}

impl<'a> From<&'a SensorSample> for WirePayload<'a> {
    fn from(s: &'a SensorSample) -> Self {
        Self {
            ax: s.ax,
            ay: s.ay,
            az: s.az,
            gx: s.gx,
            gy: s.gy,
            gz: s.gz,
            label: &s.label,
        }
    }
}

/// Encode a sample. Non-finite channels become JSON `null`.
pub fn encode(sample: &SensorSample) -> EncodedPayload {
    if !sample.is_finite() {
        log::warn!("Sample has non-finite channels; encoding them as null");
    }

    match to_json(sample) {
        Ok(json) => EncodedPayload(json),
        Err(e) => {
            // Derived Serialize over f32 and &str into a String only errors on
            // a custom serializer or a failing writer; neither is in play here.
            log::error!("Failed to serialize sample ({}); sending null", e);
            EncodedPayload(String::from("null"))
        }
    }
}

fn to_json(sample: &SensorSample) -> serde_json::Result<String> {
    serde_json::to_string(&WirePayload::from(sample))
}
