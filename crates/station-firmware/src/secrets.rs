//! Credentials baked in at build time from `.env`.

use station_core::config::{ConfigError, StationConfig};

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const THINGSPEAK_CHANNEL_ID: &str = env!("THINGSPEAK_CHANNEL_ID");
pub const THINGSPEAK_WRITE_API_KEY: &str = env!("THINGSPEAK_WRITE_API_KEY");

/// Default station configuration with the build-time secrets filled in.
pub fn station_config() -> Result<StationConfig, ConfigError> {
    let channel_id = THINGSPEAK_CHANNEL_ID
        .parse()
        .map_err(|_| ConfigError::Invalid {
            field: "channel.channel_id",
            reason: "THINGSPEAK_CHANNEL_ID is not a number",
        })?;
    let config = StationConfig::with_credentials(
        WIFI_SSID,
        WIFI_PASSWORD,
        channel_id,
        THINGSPEAK_WRITE_API_KEY,
    )?;
    config.validate()?;
    Ok(config)
}
