// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Motorola S-record validation, decoding and encoding.
//!
//! Only the 2-byte address form is decoded. Line layout:
//!
//! ```text
//! S 1 CC AAAA DD..DD KK
//! | | |  |    |      +-- checksum: !(sum of CC, AAAA and DD bytes) & 0xFF
//! | | |  |    +--------- up to 16 data bytes
//! | | |  +-------------- address, big endian
//! | | +----------------- byte count: address + data + checksum bytes
//! | +------------------- record type
//! +--------------------- marker
//! ```

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::layout::{MAX_DATA_BYTES, MAX_DATA_GROUPS, MAX_LINE_LEN, MIN_BYTE_COUNT, RECORD_MARKER, WORD_SIZE};

const TYPE_OFFSET: usize = 1;
const COUNT_OFFSET: usize = 2;
const ADDRESS_OFFSET: usize = 4;
const DATA_OFFSET: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Line does not start with the record marker.
    NotARecord,
    /// Line ends before the span its byte count declares.
    Truncated,
    /// Non-hex character inside the decoded span.
    InvalidHex,
    ChecksumMismatch { expected: u8, computed: u8 },
    /// Byte count below address + checksum.
    ByteCountTooSmall(u8),
    /// More data bytes than the fixed data groups can hold.
    PayloadTooLarge(u8),
    /// Line outgrew its queue slot; only its tail was received.
    Overrun,
    /// Record data falls outside the writable application region.
    AddressOutOfRange(u32),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotARecord => write!(f, "line does not start with 'S'"),
            Self::Truncated => write!(f, "line shorter than its byte count"),
            Self::InvalidHex => write!(f, "invalid hex character"),
            Self::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch: record says 0x{:02X}, computed 0x{:02X}",
                expected, computed
            ),
            Self::ByteCountTooSmall(count) => write!(f, "byte count {} below minimum", count),
            Self::PayloadTooLarge(len) => {
                write!(f, "{} data bytes exceed the {} byte limit", len, MAX_DATA_BYTES)
            }
            Self::Overrun => write!(f, "line longer than the receive buffer"),
            Self::AddressOutOfRange(address) => {
                write!(f, "address 0x{:04X} outside the application region", address)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RecordError {}

/// Record type, from the character after the marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordKind {
    /// `1`: data with a 2-byte address.
    Data,
    /// `9`: end of block.
    End,
    /// Any other type character. Accepted on the wire, ignored.
    Other(u8),
}

impl RecordKind {
    pub fn from_type_char(c: u8) -> Self {
        match c {
            b'1' => Self::Data,
            b'9' => Self::End,
            other => Self::Other(other),
        }
    }

    /// Kind of a raw line, `None` for lines too short to carry a type.
    pub fn of(line: &[u8]) -> Option<Self> {
        line.get(TYPE_OFFSET).copied().map(Self::from_type_char)
    }
}

fn nibble(c: u8) -> Result<u8, RecordError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(RecordError::InvalidHex),
    }
}

/// Decode the hex pair starting at `at`.
pub fn hex_byte(line: &[u8], at: usize) -> Result<u8, RecordError> {
    match line.get(at..at + 2) {
        Some(&[high, low]) => Ok((nibble(high)? << 4) | nibble(low)?),
        _ => Err(RecordError::Truncated),
    }
}

/// One's complement of the byte sum, as carried in the checksum field.
pub fn checksum(bytes: impl IntoIterator<Item = u8>) -> u8 {
    !bytes.into_iter().fold(0u8, |sum, byte| sum.wrapping_add(byte))
}

/// Check the marker and checksum of a raw line.
///
/// Returns the declared byte count. The sum covers the byte count field through
/// the last data byte; the checksum pair follows the last data byte.
pub fn validate(line: &[u8]) -> Result<u8, RecordError> {
    if line.first() != Some(&RECORD_MARKER) {
        return Err(RecordError::NotARecord);
    }

    let byte_count = hex_byte(line, COUNT_OFFSET)?;
    let mut sum = 0u8;
    for i in 0..byte_count as usize {
        sum = sum.wrapping_add(hex_byte(line, COUNT_OFFSET + 2 * i)?);
    }

    let computed = !sum;
    let expected = hex_byte(line, COUNT_OFFSET + 2 * byte_count as usize)?;
    if computed != expected {
        return Err(RecordError::ChecksumMismatch { expected, computed });
    }

    Ok(byte_count)
}

/// A decoded data record: address plus up to four 4-byte data groups.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    pub address: u32,
    /// Byte count as declared on the line.
    pub byte_count: u8,
    /// Data bytes carried by the line.
    pub data_len: u8,
    /// Reserved, always 0.
    pub priority: u8,
    groups: Vec<[u8; WORD_SIZE], MAX_DATA_GROUPS>,
}

impl Record {
    /// Decode address and data of a line already checked by [`validate`].
    ///
    /// A trailing partial group is padded with `0xFF`, the erased flash value.
    pub fn parse(line: &[u8], byte_count: u8) -> Result<Self, RecordError> {
        if byte_count < MIN_BYTE_COUNT {
            return Err(RecordError::ByteCountTooSmall(byte_count));
        }
        let data_len = byte_count - MIN_BYTE_COUNT;
        if data_len as usize > MAX_DATA_BYTES {
            return Err(RecordError::PayloadTooLarge(data_len));
        }

        let address = u16::from_be_bytes([
            hex_byte(line, ADDRESS_OFFSET)?,
            hex_byte(line, ADDRESS_OFFSET + 2)?,
        ]);

        let mut groups = Vec::new();
        for start in (0..data_len as usize).step_by(WORD_SIZE) {
            let mut word = [0xFF; WORD_SIZE];
            let available = (data_len as usize - start).min(WORD_SIZE);
            for (i, byte) in word.iter_mut().take(available).enumerate() {
                *byte = hex_byte(line, DATA_OFFSET + 2 * (start + i))?;
            }
            // Capacity is guaranteed by the payload check above.
            let _ = groups.push(word);
        }

        Ok(Self {
            address: address as u32,
            byte_count,
            data_len,
            priority: 0,
            groups,
        })
    }

    /// Populated data groups, in address order.
    pub fn groups(&self) -> &[[u8; WORD_SIZE]] {
        &self.groups
    }

    /// `(address, word)` pairs: the first group at the record address, each
    /// following group 4 bytes further.
    pub fn words(&self) -> impl Iterator<Item = (u32, [u8; WORD_SIZE])> + '_ {
        self.groups
            .iter()
            .enumerate()
            .map(move |(k, word)| (self.address + (k * WORD_SIZE) as u32, *word))
    }
}

/// Validate and parse in one step.
pub fn decode(line: &[u8]) -> Result<Record, RecordError> {
    let byte_count = validate(line)?;
    Record::parse(line, byte_count)
}

/// An encoded line, without terminator.
pub type LineBuf = String<MAX_LINE_LEN>;

/// Encode a 2-byte-address record of the given type character.
pub fn encode_record(type_char: u8, address: u16, data: &[u8]) -> Result<LineBuf, RecordError> {
    if data.len() > MAX_DATA_BYTES {
        return Err(RecordError::PayloadTooLarge(data.len() as u8));
    }

    let byte_count = data.len() as u8 + MIN_BYTE_COUNT;
    let [addr_hi, addr_lo] = address.to_be_bytes();
    let sum = checksum(
        [byte_count, addr_hi, addr_lo]
            .into_iter()
            .chain(data.iter().copied()),
    );

    let mut line = LineBuf::new();
    // Fits: MAX_LINE_LEN is checked against the longest record in `layout`.
    let _ = write!(line, "S{}{:02X}{:04X}", type_char as char, byte_count, address);
    for byte in data {
        let _ = write!(line, "{:02X}", byte);
    }
    let _ = write!(line, "{:02X}", sum);

    Ok(line)
}

/// Encode an S1 data record.
pub fn encode_data_record(address: u16, data: &[u8]) -> Result<LineBuf, RecordError> {
    encode_record(b'1', address, data)
}

/// Encode an S9 end record carrying the entry address.
pub fn encode_end_record(entry: u16) -> LineBuf {
    // No payload, cannot exceed the data limit.
    encode_record(b'9', entry, &[]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_accepts_both_cases() {
        assert_eq!(nibble(b'a'), Ok(10));
        assert_eq!(nibble(b'F'), Ok(15));
        assert_eq!(nibble(b'g'), Err(RecordError::InvalidHex));
    }

    #[test]
    fn test_hex_byte_at_end_of_line_is_truncated() {
        assert_eq!(hex_byte(b"S1A", 2), Err(RecordError::Truncated));
    }

    #[test]
    fn test_checksum_of_end_record() {
        assert_eq!(checksum([0x03, 0x00, 0x00]), 0xFC);
    }
}
