// MotionLink — Hardware, Network & Upload Configuration
// Target: ESP32 (ESP-IDF std) with an ICM-20608 / MPU-6050 on I2C

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{bail, Context};

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 21;
pub const PIN_I2C_SCL: i32 = 22;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_IMU: u8 = 0x68;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks
pub const I2C_BAUDRATE_KHZ: u32 = 400;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 8192;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SAMPLE_INTERVAL_MS: u64 = 2000;
pub const WIFI_POLL_INTERVAL_MS: u64 = 100;
pub const WIFI_READY_TIMEOUT_MS: u64 = 30_000;
pub const NETWORK_SETTLE_MS: u64 = 3000;
pub const DNS_SETTLE_MS: u64 = 1000; // after the DNS override, before the pre-check
pub const SENSOR_START_DELAY_MS: u64 = 2000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------
pub const DEFAULT_URL: &str = "http://cathlynramo.pythonanywhere.com/api/data";
pub const DEFAULT_LABEL: &str = "walking";
pub const HTTP_DEFAULT_PORT: u16 = 80;
pub const MAX_RESPONSE_BYTES: usize = 4096;
/// Size of the single receive window in [`ResponseMode::Legacy`]; one byte is
/// kept back for the terminator the old firmware appended.
pub const LEGACY_RESPONSE_BUFFER: usize = 512;

/// Where samples are POSTed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Parse `http://host[:port][/path]`. Only plain HTTP is accepted.
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        let rest = match url.split_once("://") {
            Some(("http", rest)) => rest,
            Some((scheme, _)) => bail!("unsupported scheme `{}` (only http)", scheme),
            None => bail!("missing scheme in `{}`", url),
        };

        let (authority, path) = match rest.find('/') {
            Some(ix) => (&rest[..ix], &rest[ix..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .with_context(|| format!("invalid port `{}` in `{}`", port, url))?;
                (host, port)
            }
            None => (authority, HTTP_DEFAULT_PORT),
        };

        if host.is_empty() {
            bail!("missing host in `{}`", url);
        }

        Ok(Self::new(host, port, path))
    }

    /// Value for the `Host` header: the port is only spelled out when it is
    /// not the HTTP default.
    pub fn host_header(&self) -> String {
        if self.port == HTTP_DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Per-step socket timeouts. `None` blocks indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

impl Timeouts {
    /// No timeouts at all, like the original RT-Thread firmware.
    pub fn blocking() -> Self {
        Self {
            connect: None,
            read: None,
            write: None,
        }
    }

    /// Name of the first step configured with a zero duration. std sockets
    /// reject `Some(Duration::ZERO)`; `None` is the way to block.
    pub fn zero_step(&self) -> Option<&'static str> {
        [("connect", self.connect), ("read", self.read), ("write", self.write)]
            .into_iter()
            .find(|(_, t)| *t == Some(Duration::ZERO))
            .map(|(step, _)| step)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        let t = Some(Duration::from_millis(DEFAULT_TIMEOUT_MS));
        Self {
            connect: t,
            read: t,
            write: t,
        }
    }
}

/// How a response is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Read the full response head (and body, bounded) and parse the status code.
    #[default]
    StatusLine,
    /// One bounded read; success iff the bytes contain `200 OK`.
    Legacy,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub endpoint: Endpoint,
    pub timeouts: Timeouts,
    pub response_mode: ResponseMode,
    pub max_response_bytes: usize,
}

impl UploadConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeouts: Timeouts::default(),
            response_mode: ResponseMode::default(),
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }
}

/// Everything the firmware needs at boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub upload: UploadConfig,
    pub label: String,
    pub sample_interval: Duration,
    pub network_settle: Duration,
    /// Resolver to install once DHCP is done; `None` keeps the DHCP-provided one.
    pub dns: Option<Ipv4Addr>,
}

impl AppConfig {
    /// Build from `MOTIONLINK_*` variables captured at compile time.
    pub fn from_build_env() -> anyhow::Result<Self> {
        Self::from_values(
            option_env!("MOTIONLINK_WIFI_SSID"),
            option_env!("MOTIONLINK_WIFI_PASS"),
            option_env!("MOTIONLINK_URL"),
            option_env!("MOTIONLINK_LABEL"),
            option_env!("MOTIONLINK_INTERVAL_MS"),
            option_env!("MOTIONLINK_DNS"),
        )
    }

    fn from_values(
        ssid: Option<&str>,
        password: Option<&str>,
        url: Option<&str>,
        label: Option<&str>,
        interval_ms: Option<&str>,
        dns: Option<&str>,
    ) -> anyhow::Result<Self> {
        let endpoint = Endpoint::from_url(url.unwrap_or(DEFAULT_URL))
            .context("MOTIONLINK_URL")?;

        let interval_ms = match interval_ms {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("MOTIONLINK_INTERVAL_MS: `{}` is not a number", v))?,
            None => SAMPLE_INTERVAL_MS,
        };

        let dns = dns
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<Ipv4Addr>()
                    .with_context(|| format!("MOTIONLINK_DNS: `{}` is not an IPv4 address", v))
            })
            .transpose()?;

        let ssid = ssid.unwrap_or_default();
        if ssid.is_empty() {
            log::warn!("MOTIONLINK_WIFI_SSID not set at build time");
        }

        Ok(Self {
            wifi_ssid: ssid.to_string(),
            wifi_password: password.unwrap_or_default().to_string(),
            upload: UploadConfig::new(endpoint),
            label: label.unwrap_or(DEFAULT_LABEL).to_string(),
            sample_interval: Duration::from_millis(interval_ms),
            network_settle: Duration::from_millis(NETWORK_SETTLE_MS),
            dns,
        })
    }
}
