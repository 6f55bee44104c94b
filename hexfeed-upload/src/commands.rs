// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use hexfeed_common::session::{MSG_COMPLETED, MSG_FAILED, MSG_PROGRESS, MSG_READY};
use hexfeed_common::RecordKind;

use crate::image::{self, ImageSummary, SrecImage};
use crate::transport::Transport;

/// Validate an S-record file and print its summary.
pub fn check(file: &Path) -> Result<()> {
    let image = SrecImage::load(file)?;
    print_summary(file, &image.summary);
    println!("OK");
    Ok(())
}

/// Convert a raw binary into an S-record file.
pub fn convert(input: &Path, base: u16, output: &Path) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let text = image::binary_to_srec(&data, base)?;
    fs::write(output, &text).with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} ({} bytes at 0x{:04X}, {} lines)",
        output.display(),
        data.len(),
        base,
        text.lines().count()
    );
    Ok(())
}

/// Stream an S-record file to the bootloader.
///
/// Each data record is sent only after the previous one was acknowledged with
/// a progress dot, so the bootloader's record queue never overflows.
pub fn upload(transport: &mut Transport, file: &Path, prompt_timeout_ms: u64) -> Result<()> {
    let image = SrecImage::load(file)?;
    print_summary(file, &image.summary);
    println!();

    print!(
        "Waiting for bootloader on {} (hold the trigger and reset the board)... ",
        transport.port_name()
    );
    std::io::stdout().flush()?;
    transport.drain_rx();
    transport.wait_for_timeout(&[MSG_READY], Duration::from_millis(prompt_timeout_ms))?;
    println!("OK");

    let pb = ProgressBar::new(image.summary.data_records as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut skipped = 0usize;
    for line in &image.lines {
        match line.kind {
            RecordKind::Data => {
                transport.send_line(&line.text)?;
                let ack = transport
                    .wait_for(&[MSG_PROGRESS, MSG_FAILED])
                    .with_context(|| format!("No acknowledgement for line {}", line.number))?;
                if ack == 1 {
                    pb.abandon();
                    bail!("Bootloader rejected line {}: {}", line.number, line.text);
                }
                pb.inc(1);
            }
            RecordKind::End => {
                transport.send_line(&line.text)?;
                let ack = transport
                    .wait_for(&[MSG_COMPLETED, MSG_FAILED])
                    .context("No completion message after the end record")?;
                if ack == 1 {
                    pb.abandon();
                    bail!("Bootloader reported failure at the end record");
                }
            }
            // Ignored by the bootloader, and they get no acknowledgement to
            // pace on.
            RecordKind::Other(_) => skipped += 1,
        }
    }

    pb.finish_with_message("Upload complete");
    println!();
    if skipped > 0 {
        println!("Skipped {} non-data records", skipped);
    }
    println!("Firmware uploaded successfully!");
    println!("Release the trigger and reset the board to run the application.");

    Ok(())
}

fn print_summary(file: &Path, summary: &ImageSummary) {
    println!("Image:    {}", file.display());
    println!(
        "Records:  {} data, {} other",
        summary.data_records, summary.other_records
    );
    match summary.address_range {
        Some((lo, hi)) => println!("Range:    0x{:04X}..0x{:05X}", lo, hi),
        None => println!("Range:    (empty)"),
    }
    println!(
        "Payload:  {} bytes, CRC32: 0x{:08x}",
        summary.payload_bytes, summary.crc32
    );
}
