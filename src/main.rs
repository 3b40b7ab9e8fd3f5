//! Command line entry point for tn3270r
//!
//! Replays a captured inbound 3270 stream through a session and prints the
//! final screen. Files transferred during the replay are written to the
//! configured transfer directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::{debug, error, info, warn};

use tn3270r::config::{default_config_path, ClientConfig};
use tn3270r::transfer::{ChannelFileStore, DirectoryFileStore, FileStore};
use tn3270r::Session;

/// Capture file layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureFormat {
    /// One message per line, hex bytes separated by whitespace
    Hex,
    /// Messages prefixed with a 2-byte big-endian length
    Binary,
}

fn print_usage() {
    println!("tn3270r - IBM 3270 data stream replay");
    println!();
    println!("Usage: tn3270r [OPTIONS] <capture>");
    println!();
    println!("Options:");
    println!("  --config <path> or -c <path>   Config file (default: platform config dir)");
    println!("  --binary or -b                 Capture is length-prefixed binary");
    println!("                                 (default: hex lines)");
    println!("  --transfer-dir <path>          Write transferred files here instead of");
    println!("                                 the configured root");
    println!("  --help or -h                   Show this help message");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = default_config_path();
    let mut format = CaptureFormat::Hex;
    let mut transfer_dir: Option<PathBuf> = None;
    let mut capture: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let Some(value) = args.get(i + 1) else { bail!("--config requires a path") };
                config_path = PathBuf::from(value);
                i += 1;
            }
            "--binary" | "-b" => format = CaptureFormat::Binary,
            "--transfer-dir" => {
                let Some(value) = args.get(i + 1) else { bail!("--transfer-dir requires a path") };
                transfer_dir = Some(PathBuf::from(value));
                i += 1;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other if other.starts_with('-') => warn!("ignoring unknown option {other}"),
            other => capture = Some(PathBuf::from(other)),
        }
        i += 1;
    }

    let Some(capture) = capture else {
        print_usage();
        bail!("no capture file given");
    };

    let mut config = ClientConfig::load_or_default(&config_path);
    if let Some(dir) = transfer_dir {
        config.transfer_root = dir;
    }

    let raw = fs::read(&capture).with_context(|| format!("reading {}", capture.display()))?;
    let messages = match format {
        CaptureFormat::Hex => parse_hex_capture(&raw)?,
        CaptureFormat::Binary => parse_binary_capture(&raw)?,
    };
    info!("replaying {} messages from {}", messages.len(), capture.display());

    let (store, mut receiver) = ChannelFileStore::channel();
    let mut directory = DirectoryFileStore::from_config(&config);
    let writer = tokio::spawn(async move {
        let mut written = 0usize;
        while let Some(file) = receiver.recv().await {
            match directory.store(file) {
                Ok(()) => written += 1,
                Err(err) => error!("{err}"),
            }
        }
        written
    });

    let mut session = Session::new(&config, Box::new(store));
    for (n, message) in messages.iter().enumerate() {
        let outbound = match session.process_message(message) {
            Ok(outbound) => outbound,
            Err(err) => {
                warn!("message {n}: {err}");
                err.replies
            }
        };
        for reply in outbound {
            debug!("message {n}: reply {:02X?}", reply);
        }
        if let Some(err) = session.take_transfer_error() {
            warn!("message {n}: {err}");
        }
    }

    println!("{}", session.screen());
    if let Some(text) = session.host_message() {
        println!("{text}");
    }

    drop(session);
    let written = writer.await.context("file writer task failed")?;
    if written > 0 {
        println!("{written} file(s) written");
    }
    Ok(())
}

fn parse_hex_capture(raw: &[u8]) -> Result<Vec<Vec<u8>>> {
    let text = std::str::from_utf8(raw).context("hex capture is not UTF-8")?;
    let mut messages = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let message = line
            .split_whitespace()
            .map(|token| u8::from_str_radix(token, 16))
            .collect::<Result<Vec<u8>, _>>()
            .with_context(|| format!("line {}: bad hex byte", line_no + 1))?;
        messages.push(message);
    }
    Ok(messages)
}

fn parse_binary_capture(raw: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut messages = Vec::new();
    let mut pos = 0;
    while pos < raw.len() {
        let Some(prefix) = raw.get(pos..pos + 2) else {
            bail!("truncated length prefix at offset {pos}");
        };
        let len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
        let Some(message) = raw.get(pos + 2..pos + 2 + len) else {
            bail!("message at offset {pos} claims {len} bytes");
        };
        messages.push(message.to_vec());
        pos += 2 + len;
    }
    Ok(messages)
}
