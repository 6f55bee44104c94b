// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.
//!
//! The bootloader speaks plain text: S-record lines go out, status text comes
//! back. Responses are recognised by the tail of the received text.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use hexfeed_common::layout::LINE_TERMINATOR;

/// Default time to wait for an acknowledgement, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Port read timeout; bounds how often the deadline is checked.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Serial transport to the bootloader's UART.
pub struct Transport {
    port: Box<dyn SerialPort>,
    rx_buf: Vec<u8>,
    timeout: Duration,
}

impl Transport {
    /// Open the port at the given baud rate, 8N1.
    pub fn new(port_name: &str, baud: u32, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(POLL_INTERVAL)
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            port,
            rx_buf: Vec::with_capacity(1024),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    /// Send one record line followed by the line terminator.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.port
            .write_all(line.as_bytes())
            .and_then(|_| self.port.write_all(&[LINE_TERMINATOR]))
            .map_err(|e| anyhow::anyhow!("Failed to write to serial port: {}", e))?;
        self.port.flush()?;
        Ok(())
    }

    /// Wait for one of `patterns` with the default timeout.
    pub fn wait_for(&mut self, patterns: &[&str]) -> Result<usize> {
        self.wait_for_timeout(patterns, self.timeout)
    }

    /// Read until the received text ends with one of `patterns`.
    ///
    /// Returns the index of the matching pattern. Text received up to and
    /// including the match is consumed.
    pub fn wait_for_timeout(&mut self, patterns: &[&str], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 1];

        loop {
            if let Some(index) = match_tail(&self.rx_buf, patterns) {
                self.rx_buf.clear();
                return Ok(index);
            }
            if Instant::now() >= deadline {
                bail!(
                    "Timeout waiting for {:?} (received so far: {:?})",
                    patterns,
                    String::from_utf8_lossy(&self.rx_buf)
                );
            }

            match self.port.read(&mut buf) {
                Ok(1) => self.rx_buf.push(buf[0]),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => bail!("Serial read error: {}", e),
            }
        }
    }

    /// Discard anything already received.
    pub fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        self.rx_buf.clear();
    }
}

/// Index of the first pattern the buffer ends with.
fn match_tail(buf: &[u8], patterns: &[&str]) -> Option<usize> {
    patterns
        .iter()
        .position(|pattern| buf.ends_with(pattern.as_bytes()))
}
