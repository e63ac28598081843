//! Desktop simulator for the weather station.
//!
//! Runs the real measurement cycle from `station-core` against synthetic
//! sensors, a flaky network and a fake ThingSpeak endpoint. Sleep periods are
//! skipped; virtual time jumps ahead instead.
//!
//! ```text
//! station-simulator [CONFIG.toml] [CYCLES]
//! ```
//!
//! Set `RUST_LOG=debug` to see the request lines and decoded status records.

mod sim;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use embassy_futures::block_on;
use log::{info, warn};

use station_core::config::StationConfig;
use station_core::cycle::{Station, StationParts};
use station_core::device::SleepCounter;

use sim::{
    SimBattery, SimBme280, SimClock, SimNetwork, SimSystem, SimUploader, SimVeml7700, SimWorld,
};

/// Cycles run when none are requested on the command line.
const DEFAULT_CYCLES: u32 = 12;

/// Every n-th cycle the network is unreachable.
const OUTAGE_EVERY: u32 = 5;

/// Readiness checks the synthetic BME280 stays busy for.
const BME280_BUSY_CHECKS: u32 = 3;

fn load_config(path: Option<&str>) -> Result<StationConfig> {
    let config: StationConfig = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => StationConfig::with_credentials("simulated", "", 0, "SIMULATORKEY")
            .map_err(|e| anyhow!("Failed to build default config: {}", e))?,
    };
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = load_config(args.next().as_deref())?;
    let cycles = match args.next() {
        Some(n) => n.parse().context("CYCLES must be a number")?,
        None => DEFAULT_CYCLES,
    };

    info!("Starting weather station simulator");
    info!(
        "channel {}, layout {:?}, sleeping {} s between cycles",
        config.channel.channel_id, config.layout, config.schedule.sleep_interval_secs
    );

    let boot_unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let world = SimWorld::default();
    let parts = StationParts {
        network: SimNetwork::new(world.clone(), OUTAGE_EVERY),
        clock: SimClock::new(world.clone(), config.schedule.utc_offset, boot_unix_secs),
        climate: SimBme280::new(world.clone(), BME280_BUSY_CHECKS),
        light: SimVeml7700::new(world.clone()),
        battery: SimBattery::new(world.clone()),
        system: SimSystem::new(world.clone()),
        uploader: SimUploader::new(&config.channel.write_api_key, config.layout.layout()),
        delay: embassy_time::Delay,
    };

    let sleep_secs = u64::from(config.schedule.sleep_interval_secs);
    let mut station = Station::new(parts, config, SleepCounter::cold_boot());

    let mut uploaded = 0;
    for _ in 0..cycles {
        let report = block_on(station.run_cycle());
        if report.uploaded() {
            uploaded += 1;
        }
        for issue in &report.issues {
            warn!("cycle {}: {}", world.cycle(), issue);
        }
        info!("cycle {}: status {}", world.cycle(), report.record);

        info!("Go to light sleep mode ({} s simulated)", sleep_secs);
        world.advance(sleep_secs);
        station.wake();
    }

    info!("{} of {} cycles uploaded", uploaded, cycles);
    Ok(())
}
