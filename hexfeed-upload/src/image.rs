// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! S-record image loading, checking and conversion.
//!
//! Lines are validated with the same codec the bootloader runs, so an image
//! that passes here is only rejected on the target by transmission errors.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};

use hexfeed_common::layout::{ADDRESSABLE_END, APP_BASE_OFFSET, MAX_DATA_BYTES};
use hexfeed_common::srec::{self, Record, RecordKind};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// One non-empty line of an S-record file.
#[derive(Debug, Clone)]
pub struct ImageLine {
    /// 1-based line number in the source file.
    pub number: usize,
    pub text: String,
    pub kind: RecordKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSummary {
    pub data_records: usize,
    pub other_records: usize,
    pub payload_bytes: usize,
    /// Lowest and highest (exclusive) flash offsets written.
    pub address_range: Option<(u32, u32)>,
    /// CRC-32 of the payload bytes in file order.
    pub crc32: u32,
}

/// A checked image: every record up to and including the end record.
#[derive(Debug, Clone)]
pub struct SrecImage {
    pub lines: Vec<ImageLine>,
    pub summary: ImageSummary,
}

impl SrecImage {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid S-record file {}", path.display()))
    }

    /// Validate every line and collect the records the bootloader will see.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = Vec::new();
        let mut summary = ImageSummary::default();
        let mut digest = CRC32.digest();
        let mut seen_end = false;

        for (index, raw) in text.lines().enumerate() {
            let number = index + 1;
            let line = raw.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if seen_end {
                bail!("line {}: record after the end record", number);
            }

            let byte_count =
                srec::validate(line.as_bytes()).with_context(|| format!("line {}", number))?;
            let Some(kind) = RecordKind::of(line.as_bytes()) else {
                bail!("line {}: missing record type", number);
            };

            match kind {
                RecordKind::Data => {
                    let record = Record::parse(line.as_bytes(), byte_count)
                        .with_context(|| format!("line {}", number))?;
                    let start = record.address;
                    let end = start + record.data_len as u32;
                    if start < APP_BASE_OFFSET || end > ADDRESSABLE_END {
                        bail!(
                            "line {}: data at 0x{:04X}..0x{:05X} outside the application region 0x{:04X}..0x{:05X}",
                            number,
                            start,
                            end,
                            APP_BASE_OFFSET,
                            ADDRESSABLE_END
                        );
                    }

                    let payload = payload_bytes(&record);
                    digest.update(&payload);
                    summary.data_records += 1;
                    summary.payload_bytes += payload.len();
                    summary.address_range = Some(match summary.address_range {
                        Some((lo, hi)) => (lo.min(start), hi.max(end)),
                        None => (start, end),
                    });
                }
                RecordKind::End => seen_end = true,
                RecordKind::Other(_) => summary.other_records += 1,
            }

            lines.push(ImageLine {
                number,
                text: line.to_string(),
                kind,
            });
        }

        if !seen_end {
            bail!("missing S9 end record");
        }

        summary.crc32 = digest.finalize();
        Ok(Self { lines, summary })
    }
}

/// Data bytes of a record, without the padding of a partial last group.
fn payload_bytes(record: &Record) -> Vec<u8> {
    record
        .groups()
        .iter()
        .flatten()
        .copied()
        .take(record.data_len as usize)
        .collect()
}

/// Encode a binary as S1 records of up to 16 bytes plus an S9 record.
pub fn binary_to_srec(data: &[u8], base: u16) -> Result<String> {
    let end = base as usize + data.len();
    if end > ADDRESSABLE_END as usize {
        bail!(
            "{} bytes at 0x{:04X} run past 0x{:05X}, the limit of 2-byte record addresses",
            data.len(),
            base,
            ADDRESSABLE_END
        );
    }

    let mut out = String::new();
    for (i, chunk) in data.chunks(MAX_DATA_BYTES).enumerate() {
        let address = base + (i * MAX_DATA_BYTES) as u16;
        let line = srec::encode_data_record(address, chunk)?;
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&srec::encode_end_record(base));
    out.push('\n');

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "S00600004844521B\r\n\
                         S113A0000102030405060708090A0B0C0D0E0F10C4\r\n\
                         S107A010DEADBEEF10\r\n\
                         S903A0005C\r\n";

    #[test]
    fn test_parse_collects_records() {
        let image = SrecImage::parse(IMAGE).unwrap();

        assert_eq!(image.lines.len(), 4);
        assert_eq!(image.summary.data_records, 2);
        assert_eq!(image.summary.other_records, 1);
        assert_eq!(image.summary.payload_bytes, 20);
        assert_eq!(image.summary.address_range, Some((0xA000, 0xA014)));
        assert_eq!(image.lines[3].kind, RecordKind::End);
        assert_eq!(image.lines[1].text, "S113A0000102030405060708090A0B0C0D0E0F10C4");
    }

    #[test]
    fn test_crc_covers_payload_in_file_order() {
        let image = SrecImage::parse(IMAGE).unwrap();
        let mut payload: Vec<u8> = (1..=16).collect();
        payload.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(image.summary.crc32, CRC32.checksum(&payload));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let image = SrecImage::parse("\nS107A010DEADBEEF10\n\nS903A0005C\n").unwrap();
        assert_eq!(image.lines.len(), 2);
        assert_eq!(image.lines[0].number, 2);
    }

    #[test]
    fn test_bad_checksum_names_the_line() {
        let err = SrecImage::parse("S107A010DEADBEEF11\nS903A0005C\n").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("line 1"), "{}", message);
        assert!(message.contains("checksum mismatch"), "{}", message);
    }

    #[test]
    fn test_missing_end_record_is_rejected() {
        let err = SrecImage::parse("S107A010DEADBEEF10\n").unwrap_err();
        assert!(err.to_string().contains("missing S9"));
    }

    #[test]
    fn test_record_after_end_is_rejected() {
        let err = SrecImage::parse("S903A0005C\nS107A010DEADBEEF10\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_data_below_application_base_is_rejected() {
        let err = SrecImage::parse("S1071000DEADBEEFB0\nS9030000FC\n").unwrap_err();
        assert!(err.to_string().contains("outside the application region"));
    }

    #[test]
    fn test_binary_to_srec_splits_into_sixteen_byte_records() {
        let data: Vec<u8> = (0..40).collect();
        let text = binary_to_srec(&data, 0xA000).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("S113A000"));
        assert!(lines[1].starts_with("S113A010"));
        assert!(lines[2].starts_with("S10BA020"));
        assert_eq!(lines[3], "S903A0005C");

        let image = SrecImage::parse(&text).unwrap();
        assert_eq!(image.summary.payload_bytes, 40);
        assert_eq!(image.summary.crc32, CRC32.checksum(&data));
    }

    #[test]
    fn test_binary_past_address_limit_is_rejected() {
        let data = vec![0u8; 0x6001];
        assert!(binary_to_srec(&data, 0xA000).is_err());
        assert!(binary_to_srec(&data[..0x6000], 0xA000).is_ok());
    }
}
