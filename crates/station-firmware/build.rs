use std::env;

use dotenvy::from_path;

/// Secrets read from `.env` (or the environment) and baked into the binary.
const SECRETS: [(&str, &str); 4] = [
    ("WIFI_SSID", ""),
    ("WIFI_PASSWORD", ""),
    ("THINGSPEAK_CHANNEL_ID", "0"),
    ("THINGSPEAK_WRITE_API_KEY", ""),
];

fn main() {
    let _ = from_path(".env");

    println!("cargo:rerun-if-changed=.env");

    for (name, fallback) in SECRETS {
        println!("cargo:rerun-if-env-changed={}", name);
        let value = env::var(name).unwrap_or_else(|_| {
            println!("cargo:warning={} not set, using {:?}", name, fallback);
            fallback.to_owned()
        });
        println!("cargo:rustc-env={}={}", name, value);
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
