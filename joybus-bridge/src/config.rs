//! Configuration for the bridge connection.
//!
//! The bridge is a fixed-function device, so configuration is a handful of
//! values with firmware-matched defaults. Each can be overridden through a
//! `JOYBUS_*` environment variable; unparsable values fall back to the
//! default.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Serial device the bridge usually enumerates as.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Baud rate the bridge firmware is built for (8-N-1 framing).
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Bus address CRC queries are written to.
///
/// Observed on real hardware to have no effect on the returned CRC, but that
/// is an empirical observation, not a protocol guarantee, so the address
/// stays configurable.
pub const DEFAULT_ADDRESS: u16 = 0x8001;

/// Per-read timeout before a request is retransmitted.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Retransmission attempts before the bridge is declared unresponsive.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Connection parameters for a [`crate::link::BridgeLink`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Serial device path
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Default bus address for CRC queries
    pub address: u16,

    /// How long a single read waits before the frame is retransmitted
    pub read_timeout: Duration,

    /// Retransmission budget for one request
    pub max_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_ADDRESS,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl BridgeConfig {
    /// Build a configuration from the defaults plus `JOYBUS_*` environment
    /// overrides.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("JOYBUS_PORT").unwrap_or(defaults.port),
            baud_rate: env_parsed("JOYBUS_BAUD").unwrap_or(defaults.baud_rate),
            address: env_address("JOYBUS_ADDRESS").unwrap_or(defaults.address),
            read_timeout: env_parsed("JOYBUS_READ_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.read_timeout),
            max_attempts: env_parsed("JOYBUS_MAX_ATTEMPTS")
                .unwrap_or(defaults.max_attempts),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

// Addresses are conventionally written in hex, so accept an 0x prefix.
fn env_address(name: &str) -> Option<u16> {
    let value = env::var(name).ok()?;
    parse_address(&value).ok()
}

/// Parse a bus address from decimal or `0x`-prefixed hex notation.
pub fn parse_address(s: &str) -> Result<u16, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_digits) => u16::from_str_radix(hex_digits, 16),
        None => s.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_match_bridge_firmware() {
        let config = BridgeConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 38400);
        assert_eq!(config.address, 0x8001);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }

    #[test_case("0x8001", 0x8001; "hex_with_prefix")]
    #[test_case("0X8001", 0x8001; "hex_uppercase_prefix")]
    #[test_case("32769", 0x8001; "decimal")]
    #[test_case("0", 0x0000; "zero")]
    fn address_parsing(input: &str, expect: u16) {
        assert_eq!(parse_address(input).unwrap(), expect);
    }

    #[test]
    fn address_parsing_rejects_garbage() {
        assert!(parse_address("0xzz").is_err());
        assert!(parse_address("not-an-address").is_err());
    }
}
