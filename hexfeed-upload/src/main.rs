// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! S-record upload tool for hexfeed-bootloader over a serial line.
//!
//! Usage:
//!   hexfeed-upload check firmware.srec
//!   hexfeed-upload convert firmware.bin --base 0xA000 -o firmware.srec
//!   hexfeed-upload upload firmware.srec --port /dev/ttyUSB0

mod cli;
mod commands;
mod image;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
