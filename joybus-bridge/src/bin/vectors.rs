//! Generate reference CRC vectors from a connected bridge device.
//!
//! Packets are given as hex strings on the command line; one vector line is
//! printed per packet:
//!
//! ```text
//! $ joybus-vectors 01 0102 ff
//! 01 -> 85
//! 01 02 -> 5A
//! FF -> C3
//! ```

use anyhow::{Context, Result};
use clap::Parser;

use joybus_bridge::config::{self, BridgeConfig};
use joybus_bridge::tracing::{self, prelude::*};
use joybus_bridge::{BridgeLink, Packet};

#[derive(Parser)]
#[command(name = "joybus-vectors", about = "Query reference CRCs from a Joybus serial bridge")]
struct Cli {
    /// Serial device the bridge is attached to
    #[arg(long)]
    port: Option<String>,

    /// Bus address to write packets to, e.g. 0x8001
    #[arg(long, value_parser = config::parse_address)]
    address: Option<u16>,

    /// Packets as hex strings, e.g. 01 0102 a5b6
    #[arg(required = true)]
    packets: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout();
    let cli = Cli::parse();

    let mut config = BridgeConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(address) = cli.address {
        config.address = address;
    }

    let packets = cli
        .packets
        .iter()
        .map(|s| {
            hex::decode(s)
                .map(Packet::from)
                .with_context(|| format!("invalid hex packet '{}'", s))
        })
        .collect::<Result<Vec<Packet>>>()?;

    let mut link = BridgeLink::open(config)?;
    let vectors = link.generate_vectors(packets).await?;

    info!(vectors = vectors.len(), "Vector generation complete.");
    Ok(())
}
