//! Build a control message, send it with a descriptor over a socket pair,
//! and parse it back.
//!
//! ```bash
//! RUST_LOG=nlkit=trace cargo run -p nlkit --example ctl_roundtrip -- --file /etc/hostname
//! ```

use std::fs::File;
use std::io::Read;
use std::os::fd::AsFd;
use std::path::PathBuf;

use clap::Parser;
use nlkit::{Builder, CtlMsg, CtlSocket};

const KEY_VALUE: u32 = 3;
const KEY_NEST: u32 = 6;
const KEY_LABEL: u32 = 8;

#[derive(Parser)]
#[command(name = "ctl_roundtrip", about = "Send a control message through a socket pair")]
struct Cli {
    /// Command word for the message header (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x53550012", value_parser = parse_u32)]
    cmd: u32,

    /// Integer attribute value
    #[arg(long, default_value_t = 12345)]
    value: i32,

    /// String carried inside the nest
    #[arg(long, default_value = "nest 1")]
    label: String,

    /// File to open and pass along as a descriptor
    #[arg(long)]
    file: Option<PathBuf>,
}

fn parse_u32(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut buf = [0u8; 512];
    let mut b = Builder::ctl(&mut buf, cli.cmd);
    b.put_i32(KEY_VALUE, cli.value);
    let nest = b.begin_nest(KEY_NEST);
    b.put_str(KEY_LABEL, &cli.label);
    b.end_nest(nest);
    let wire = b.finish()?;

    let (client, server) = CtlSocket::pair()?;
    let file = cli.file.as_ref().map(File::open).transpose()?;
    client.send(wire, file.as_ref().map(|f| f.as_fd())).await?;
    println!("sent {} bytes", wire.len());

    let mut rx = [0u8; 512];
    let (len, fd) = server.recv(&mut rx).await?;
    let msg = CtlMsg::parse(&rx[..len])?;

    println!("cmd:   {:#010x}", msg.cmd());
    println!("value: {:?}", msg.attrs().get_i32(KEY_VALUE));
    println!(
        "label: {:?}",
        msg.attrs().get_nest(KEY_NEST).and_then(|n| n.get_str(KEY_LABEL))
    );

    if let Some(fd) = fd {
        let mut head = Vec::new();
        File::from(fd).take(64).read_to_end(&mut head)?;
        println!("fd:    {}", String::from_utf8_lossy(&head).trim_end());
    }

    Ok(())
}
