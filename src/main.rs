// MotionLink — Firmware Entry Point
//
// Boot sequence:
//   1. Connect to Wi-Fi and wait until the station interface is up.
//   2. Let DHCP settle, install the configured DNS server (if any), wait a
//      moment, then pre-check DNS for the collection endpoint.
//   3. Give the stack a little longer, bring up I2C and spawn the sensor task.
//
// The sensor task reads the IMU every interval and uploads the reading.
// Nothing is retried or queued: a failed upload is logged and the next
// sample goes out on schedule.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("motionlink firmware must be built for an ESP-IDF target")
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use anyhow::Context;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use motionlink::config::*;
    use motionlink::drivers::imu::Imu;
    use motionlink::network::{self, NetworkLink};
    use motionlink::tasks;
    use motionlink::transport::SystemResolver;
    use motionlink::wifi::WifiLink;
    use motionlink::Uploader;

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("MotionLink firmware starting…");

        let config = AppConfig::from_build_env().context("build-time configuration")?;

        // ---- Peripherals ------------------------------------------------------
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        // ---- Wi-Fi ------------------------------------------------------------
        log::info!(">>> Connecting to Wi-Fi...");
        let mut link = WifiLink::new(peripherals.modem, sysloop, Some(nvs))?.with_dns(config.dns);
        link.connect(&config.wifi_ssid, &config.wifi_password)?;

        let ready = network::wait_until_ready(
            &link,
            Duration::from_millis(WIFI_POLL_INTERVAL_MS),
            Duration::from_millis(WIFI_READY_TIMEOUT_MS),
        );
        if !ready {
            anyhow::bail!("Wi-Fi did not come up within {} ms", WIFI_READY_TIMEOUT_MS);
        }
        log::info!("Wi-Fi Connected!");

        log::info!("Waiting for network to stabilize...");
        thread::sleep(config.network_settle);
        thread::sleep(Duration::from_millis(DNS_SETTLE_MS));
        network::dns_precheck(&SystemResolver, &config.upload.endpoint);
        thread::sleep(Duration::from_millis(SENSOR_START_DELAY_MS));

        // ---- I2C bus (IMU only) ----------------------------------------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio21, // SDA
            peripherals.pins.gpio22, // SCL
            &i2c_config,
        )?;

        // ---- Sensor task -----------------------------------------------------
        let uploader = Uploader::new(config.upload.clone());
        let label = config.label.clone();
        let interval = config.sample_interval;
        let stop = Arc::new(AtomicBool::new(false));

        thread::Builder::new()
            .name("sensor".into())
            .stack_size(STACK_SENSOR)
            .spawn(move || {
                tasks::sensor::sensor_task(move || Imu::init(i2c), uploader, label, interval, stop);
            })?;
        log::info!("Sensor thread started successfully!");

        // Main thread has nothing left to do. Park it forever, keeping the
        // Wi-Fi driver alive.
        let _link = link;
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }
}
