//! ESP32-C3 firmware-specific modules for the weather station
//!
//! This crate contains the hardware-specific implementations of the
//! `station-core` traits: the WiFi link, SNTP clock, ThingSpeak client,
//! sensor adapters, the battery ADC and chip reset/wake information.

#![no_std]

extern crate alloc;

pub mod hardware;
pub mod ntp;
pub mod secrets;
pub mod sensors;
pub mod system;
pub mod thingspeak;
pub mod wifi;
