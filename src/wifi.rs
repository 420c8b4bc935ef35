// MotionLink — Wi-Fi station bring-up (ESP-IDF)

use std::net::Ipv4Addr;

use anyhow::anyhow;
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripheral;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::network::NetworkLink;

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    dns: Option<Ipv4Addr>,
}

impl WifiLink {
    pub fn new(
        modem: impl peripheral::Peripheral<P = Modem> + 'static,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;
        Ok(Self { wifi, dns: None })
    }

    /// Replace the DHCP-provided resolver once the interface is up.
    pub fn with_dns(mut self, dns: Option<Ipv4Addr>) -> Self {
        self.dns = dns;
        self
    }
}

impl NetworkLink for WifiLink {
    fn connect(&mut self, ssid: &str, password: &str) -> anyhow::Result<()> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let wifi_config = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow!("SSID `{}` is too long", ssid))?,
            password: password
                .try_into()
                .map_err(|_| anyhow!("Wi-Fi password is too long"))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&wifi_config)?;

        log::info!("Starting Wi-Fi");
        self.wifi.start()?;

        log::info!("Connecting to {}", ssid);
        self.wifi.connect()?;

        log::info!("Waiting for DHCP lease");
        self.wifi.wait_netif_up()?;

        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        log::info!("Wi-Fi connected! IP: {}", ip_info.ip);

        if let Some(dns) = self.dns {
            self.wifi.wifi_mut().sta_netif_mut().set_dns(dns);
            log::info!("DNS set to {}", dns);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.is_up().unwrap_or(false)
    }
}
