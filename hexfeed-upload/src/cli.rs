// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hexfeed_common::layout::{APP_BASE_OFFSET, UART_BAUD};

use crate::commands;
use crate::transport::{Transport, DEFAULT_TIMEOUT_MS};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "hexfeed-upload")]
#[command(about = "S-record upload tool for hexfeed-bootloader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Validate an S-record file the way the bootloader will
    Check {
        /// S-record file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Convert a raw binary into S1 records
    Convert {
        /// Binary image
        #[arg(value_name = "BIN")]
        input: PathBuf,

        /// Flash offset of the first byte (e.g. 0xA000)
        #[arg(short, long, value_parser = parse_u16, default_value_t = APP_BASE_OFFSET as u16)]
        base: u16,

        /// Output S-record file
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
    },

    /// Stream an S-record file to the bootloader
    Upload {
        /// S-record file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Serial port (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: String,

        /// Baud rate
        #[arg(long, default_value_t = UART_BAUD)]
        baud: u32,

        /// Time to wait for the bootloader prompt, in milliseconds
        #[arg(long, default_value_t = 30_000)]
        prompt_timeout: u64,

        /// Time to wait for each record acknowledgement, in milliseconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout: u64,
    },
}

/// Accept decimal or `0x`-prefixed hex.
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check { file } => commands::check(&file),
        Commands::Convert {
            input,
            base,
            output,
        } => commands::convert(&input, base, &output),
        Commands::Upload {
            file,
            port,
            baud,
            prompt_timeout,
            timeout,
        } => {
            let mut transport = Transport::new(&port, baud, timeout)?;
            commands::upload(&mut transport, &file, prompt_timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u16_hex_and_decimal() {
        assert_eq!(parse_u16("0xA000"), Ok(0xA000));
        assert_eq!(parse_u16("0Xa000"), Ok(0xA000));
        assert_eq!(parse_u16("40960"), Ok(0xA000));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u16("zz").is_err());
    }

    #[test]
    fn test_cli_parses_upload() {
        let cli = Cli::try_parse_from([
            "hexfeed-upload",
            "upload",
            "fw.srec",
            "--port",
            "/dev/ttyUSB0",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload { port, baud, .. } => {
                assert_eq!(port, "/dev/ttyUSB0");
                assert_eq!(baud, 115_200);
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn test_cli_convert_defaults_to_application_base() {
        let cli =
            Cli::try_parse_from(["hexfeed-upload", "convert", "fw.bin", "-o", "fw.srec"]).unwrap();

        match cli.command {
            Commands::Convert { base, .. } => assert_eq!(base, 0xA000),
            _ => panic!("expected convert"),
        }
    }
}
