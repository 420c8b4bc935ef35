// MotionLink — Network bring-up interface
//
// The upload transaction assumes the link is already up. The firmware brings
// it up through `NetworkLink` before the sensor task starts.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::Endpoint;
use crate::transport::Resolver;

pub trait NetworkLink {
    /// Associate and obtain an address.
    fn connect(&mut self, ssid: &str, password: &str) -> anyhow::Result<()>;

    fn is_ready(&self) -> bool;
}

/// Poll `is_ready` every `poll` until it holds or `timeout` elapses.
pub fn wait_until_ready<L: NetworkLink + ?Sized>(link: &L, poll: Duration, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if link.is_ready() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        thread::sleep(poll);
    }
}

/// Resolve the endpoint once so a broken DNS setup shows up in the boot log.
/// Never fatal: the sensor loop starts either way.
pub fn dns_precheck<R: Resolver>(resolver: &R, endpoint: &Endpoint) -> bool {
    match resolver.resolve(&endpoint.host, endpoint.port) {
        Ok(Some(addr)) => {
            log::info!("DNS pre-check OK: {}", addr.ip());
            true
        }
        Ok(None) => {
            log::warn!("DNS pre-check failed: {} has no IPv4 record", endpoint.host);
            false
        }
        Err(e) => {
            log::warn!("DNS pre-check failed: {} ({})", endpoint.host, e);
            false
        }
    }
}
