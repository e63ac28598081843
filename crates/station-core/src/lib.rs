//! Hardware-independent core library for the weather station.
//!
//! This crate contains all platform-agnostic logic: the status record
//! encoder, bounded polling, sensor traits and conversions, device cause
//! tables, time keeping, upload request building, configuration and the
//! measurement cycle.
//!
//! It is `#![no_std]` without an allocator so it compiles on the ESP32-C3 and
//! on desktop hosts (for the simulator and tests).

#![no_std]

pub mod app_state;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod device;
pub mod poll;
pub mod sensors;
pub mod status;
pub mod upload;
