//! MotionLink: sample a 6-axis IMU and POST each reading as JSON over a
//! hand-framed HTTP/1.1 exchange on a fresh TCP connection.
//!
//! Everything outside `drivers::imu` and `wifi` is plain std and builds on
//! the host; those two modules only exist for `target_os = "espidf"`.

pub mod config;
pub mod drivers;
pub mod encoder;
pub mod events;
pub mod http;
pub mod network;
pub mod tasks;
pub mod transport;
pub mod upload;

#[cfg(target_os = "espidf")]
pub mod wifi;

pub use encoder::{encode, EncodedPayload};
pub use events::{RawReading, SensorSample};
pub use upload::{upload, FailureReason, UploadOutcome, Uploader, Uplink};
