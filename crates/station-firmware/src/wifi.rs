//! WiFi station link.

use embassy_net::{Runner, Stack};
use embassy_time::{Delay, Duration};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use log::{debug, error, info, warn};

use station_core::config::{InternetConfig, PasswordString, SsidString};
use station_core::cycle::Connectivity;
use station_core::poll::{PollOutcome, poll_until_ready_async};

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Brings the station interface up for each upload and down again before
/// sleeping.
pub struct WifiLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    ssid: SsidString,
    password: PasswordString,
    attempts: u32,
    attempt_delay: Duration,
}

impl WifiLink {
    pub fn new(
        controller: WifiController<'static>,
        stack: Stack<'static>,
        config: &InternetConfig,
    ) -> Self {
        Self {
            controller,
            stack,
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            attempts: config.connect_attempts,
            attempt_delay: Duration::from_millis(u64::from(config.connect_delay_ms)),
        }
    }

    fn is_up(&self) -> bool {
        self.stack.is_link_up() && self.stack.config_v4().is_some()
    }

    async fn ensure_started(&mut self) -> bool {
        if matches!(self.controller.is_started(), Ok(true)) {
            return true;
        }

        let mode = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(self.ssid.as_str().into())
                .with_password(self.password.as_str().into()),
        );
        if let Err(e) = self.controller.set_config(&mode) {
            error!("WiFi set_config failed: {:?}", e);
            return false;
        }
        if let Err(e) = self.controller.start_async().await {
            error!("WiFi start failed: {:?}", e);
            return false;
        }
        true
    }
}

impl Connectivity for WifiLink {
    async fn connect(&mut self) -> bool {
        if self.is_up() {
            return true;
        }
        if !self.ensure_started().await {
            return false;
        }

        info!("Connecting to WiFi {}", self.ssid);
        if let Err(e) = self.controller.connect_async().await {
            warn!("WiFi association failed: {:?}", e);
            return false;
        }

        let stack = self.stack;
        let outcome = poll_until_ready_async(
            || async move { stack.is_link_up() && stack.config_v4().is_some() },
            self.attempts,
            self.attempt_delay,
            &mut Delay,
        )
        .await;

        match (outcome, self.stack.config_v4()) {
            (PollOutcome::Ready, Some(config)) => {
                info!("{} => connected", config.address);
                true
            }
            _ => {
                warn!("WiFi didn't connect");
                false
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.controller.disconnect_async().await {
            debug!("WiFi disconnect: {:?}", e);
        }
    }
}
