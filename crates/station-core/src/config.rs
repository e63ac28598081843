//! Station configuration.
//!
//! Defaults reproduce the long-standing field setup: ten minute cycles, CEST,
//! a 5.8 V full-scale battery divider and the extended status layout. The
//! firmware fills credentials in at build time; the simulator can load the
//! whole structure from TOML.

use heapless::String;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::clock::UtcOffset;
use crate::status::LayoutVersion;

pub type SsidString = String<32>;
pub type PasswordString = String<64>;
pub type ApiKeyString = String<32>;
pub type HostString = String<64>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} is longer than its buffer")]
    TooLong { field: &'static str },
    #[error("{field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct StationConfig {
    pub internet: InternetConfig,
    pub channel: ChannelConfig,
    pub schedule: ScheduleConfig,
    pub sampling: SamplingConfig,
    pub battery: BatteryConfig,
    pub layout: LayoutVersion,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct InternetConfig {
    pub ssid: SsidString,
    pub password: PasswordString,
    /// Association checks before giving up on this cycle.
    pub connect_attempts: u32,
    pub connect_delay_ms: u32,
}

impl Default for InternetConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            connect_attempts: 16,
            connect_delay_ms: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ChannelConfig {
    pub channel_id: u32,
    pub write_api_key: ApiKeyString,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sleep_interval_secs: u32,
    pub ntp_server: HostString,
    pub utc_offset: UtcOffset,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sleep_interval_secs: 600,
            ntp_server: String::try_from("pool.ntp.org").unwrap_or_default(),
            utc_offset: UtcOffset::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SamplingConfig {
    pub settle_ms: u32,
    pub poll_attempts: u32,
    pub poll_delay_ms: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 200,
            poll_attempts: 100,
            poll_delay_ms: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BatteryConfig {
    pub divider_scale: f32,
    pub full_scale: u16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            divider_scale: 5.8,
            full_scale: 4096,
        }
    }
}

fn bounded<const N: usize>(field: &'static str, value: &str) -> Result<String<N>, ConfigError> {
    String::try_from(value).map_err(|_| ConfigError::TooLong { field })
}

impl StationConfig {
    /// Defaults plus the secrets that are never checked in.
    pub fn with_credentials(
        ssid: &str,
        password: &str,
        channel_id: u32,
        write_api_key: &str,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.internet.ssid = bounded("internet.ssid", ssid)?;
        config.internet.password = bounded("internet.password", password)?;
        config.channel.channel_id = channel_id;
        config.channel.write_api_key = bounded("channel.write_api_key", write_api_key)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.sleep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.sleep_interval_secs",
                reason: "must be positive",
            });
        }
        if self.battery.full_scale == 0 {
            return Err(ConfigError::Invalid {
                field: "battery.full_scale",
                reason: "must be positive",
            });
        }
        if !(self.battery.divider_scale.is_finite() && self.battery.divider_scale > 0.0) {
            return Err(ConfigError::Invalid {
                field: "battery.divider_scale",
                reason: "must be a positive number",
            });
        }
        if self.sampling.poll_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling.poll_attempts",
                reason: "at least one readiness check is required",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;

    #[test]
    fn test_defaults_match_field_setup() {
        let config = StationConfig::default();
        assert_eq!(config.schedule.sleep_interval_secs, 600);
        assert_eq!(config.schedule.ntp_server.as_str(), "pool.ntp.org");
        assert_eq!(config.schedule.utc_offset.total_seconds(), 7200);
        assert_eq!(config.sampling.poll_attempts, 100);
        assert_eq!(config.internet.connect_attempts, 16);
        assert_eq!(config.battery.full_scale, 4096);
        assert_eq!(config.layout, LayoutVersion::Extended);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_with_credentials() {
        let config = StationConfig::with_credentials("home", "secret", 42, "WRITEKEY").unwrap();
        assert_eq!(config.internet.ssid.as_str(), "home");
        assert_eq!(config.channel.channel_id, 42);
        assert_eq!(config.channel.write_api_key.as_str(), "WRITEKEY");
    }

    #[test]
    fn test_overlong_credentials_rejected() {
        let long = std::string::String::from("s").repeat(33);
        assert_eq!(
            StationConfig::with_credentials(&long, "", 0, ""),
            Err(ConfigError::TooLong {
                field: "internet.ssid"
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = StationConfig::default();
        config.battery.full_scale = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "battery.full_scale", .. })
        ));

        let mut config = StationConfig::default();
        config.sampling.poll_attempts = 0;
        assert!(config.validate().is_err());
    }
}
