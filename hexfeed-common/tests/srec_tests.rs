// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for S-record validation, parsing and encoding.

use hexfeed_common::layout::{MAX_DATA_BYTES, MIN_BYTE_COUNT};
use hexfeed_common::srec::{
    checksum, decode, encode_data_record, encode_end_record, validate, Record, RecordError,
    RecordKind,
};

const DEADBEEF_LINE: &str = "S1071000DEADBEEFB0";
const FULL_LINE: &str = "S1137AF00A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0AE2";
const END_LINE: &str = "S9030000FC";

/// Replace the two checksum characters of a line.
fn with_checksum(line: &str, checksum: u8) -> String {
    format!("{}{:02X}", &line[..line.len() - 2], checksum)
}

// =============================================================================
// validate tests
// =============================================================================

#[test]
fn test_validate_returns_declared_byte_count() {
    assert_eq!(validate(DEADBEEF_LINE.as_bytes()), Ok(0x07));
    assert_eq!(validate(FULL_LINE.as_bytes()), Ok(0x13));
    assert_eq!(validate(END_LINE.as_bytes()), Ok(0x03));
}

#[test]
fn test_validate_accepts_lowercase_hex() {
    assert_eq!(validate(b"S1071000deadbeefb0"), Ok(0x07));
}

#[test]
fn test_validate_ignores_trailing_carriage_return() {
    assert_eq!(validate(b"S9030000FC\r"), Ok(0x03));
}

#[test]
fn test_validate_rejects_every_single_bit_checksum_flip() {
    for line in [DEADBEEF_LINE, FULL_LINE, END_LINE] {
        let good = u8::from_str_radix(&line[line.len() - 2..], 16).unwrap();
        for bit in 0..8 {
            let corrupted = with_checksum(line, good ^ (1 << bit));
            let result = validate(corrupted.as_bytes());
            assert_eq!(
                result,
                Err(RecordError::ChecksumMismatch {
                    expected: good ^ (1 << bit),
                    computed: good,
                }),
                "line {} bit {}",
                line,
                bit
            );
        }
    }
}

#[test]
fn test_validate_rejects_lines_without_marker() {
    for line in ["s9030000FC", "X1071000DEADBEEFB0", "9030000FC", " S9030000FC", ""] {
        assert_eq!(validate(line.as_bytes()), Err(RecordError::NotARecord), "{:?}", line);
    }
}

#[test]
fn test_validate_truncated_line() {
    assert_eq!(validate(b"S1071000DEAD"), Err(RecordError::Truncated));
    assert_eq!(validate(b"S1"), Err(RecordError::Truncated));
}

#[test]
fn test_validate_invalid_hex() {
    assert_eq!(validate(b"S1071000DEADBEEZB0"), Err(RecordError::InvalidHex));
}

#[test]
fn test_validate_ignores_record_type() {
    // Type is the orchestrator's concern; any type with a good checksum passes.
    assert_eq!(validate(b"S0030000FC"), Ok(0x03));
}

// =============================================================================
// RecordKind tests
// =============================================================================

#[test]
fn test_record_kind_of_line() {
    assert_eq!(RecordKind::of(DEADBEEF_LINE.as_bytes()), Some(RecordKind::Data));
    assert_eq!(RecordKind::of(END_LINE.as_bytes()), Some(RecordKind::End));
    assert_eq!(RecordKind::of(b"S0030000FC"), Some(RecordKind::Other(b'0')));
    assert_eq!(RecordKind::of(b"S"), None);
    assert_eq!(RecordKind::of(b""), None);
}

// =============================================================================
// Record::parse tests
// =============================================================================

#[test]
fn test_parse_deadbeef_record() {
    let line = DEADBEEF_LINE.as_bytes();
    let record = Record::parse(line, validate(line).unwrap()).unwrap();

    assert_eq!(record.address, 0x1000);
    assert_eq!(record.byte_count, 7);
    assert_eq!(record.data_len, 4);
    assert_eq!(record.priority, 0);
    assert_eq!(record.groups(), &[[0xDE, 0xAD, 0xBE, 0xEF]]);
}

#[test]
fn test_parse_full_record_has_four_groups() {
    let record = decode(FULL_LINE.as_bytes()).unwrap();

    assert_eq!(record.address, 0x7AF0);
    assert_eq!(record.data_len, 16);
    assert_eq!(record.groups().len(), 4);
    assert!(record.groups().iter().all(|group| *group == [0x0A; 4]));
}

#[test]
fn test_words_advance_by_four_bytes() {
    let record = decode(FULL_LINE.as_bytes()).unwrap();
    let addresses: Vec<u32> = record.words().map(|(address, _)| address).collect();
    assert_eq!(addresses, vec![0x7AF0, 0x7AF4, 0x7AF8, 0x7AFC]);
}

#[test]
fn test_parse_record_without_data() {
    let record = decode(b"S1031234B6").unwrap();
    assert_eq!(record.address, 0x1234);
    assert_eq!(record.data_len, 0);
    assert!(record.groups().is_empty());
    assert_eq!(record.words().count(), 0);
}

#[test]
fn test_parse_pads_partial_group_with_erased_value() {
    let line = encode_data_record(0x2000, &[1, 2, 3, 4, 5, 6]).unwrap();
    let record = decode(line.as_bytes()).unwrap();

    assert_eq!(record.data_len, 6);
    assert_eq!(record.groups(), &[[1, 2, 3, 4], [5, 6, 0xFF, 0xFF]]);
}

#[test]
fn test_parse_rejects_byte_count_below_minimum() {
    assert_eq!(
        Record::parse(b"S1021234B7", 2),
        Err(RecordError::ByteCountTooSmall(2))
    );
}

#[test]
fn test_parse_rejects_payload_over_sixteen_bytes() {
    // 20 data bytes, valid checksum.
    let data: Vec<u8> = (0..20).collect();
    let byte_count = data.len() as u8 + MIN_BYTE_COUNT;
    let sum = checksum([byte_count, 0x00, 0x00].into_iter().chain(data.iter().copied()));
    let mut line = format!("S1{:02X}0000", byte_count);
    for byte in &data {
        line.push_str(&format!("{:02X}", byte));
    }
    line.push_str(&format!("{:02X}", sum));

    assert_eq!(validate(line.as_bytes()), Ok(byte_count));
    assert_eq!(decode(line.as_bytes()), Err(RecordError::PayloadTooLarge(20)));
}

// =============================================================================
// Encoder tests
// =============================================================================

#[test]
fn test_encode_matches_known_lines() {
    assert_eq!(
        encode_data_record(0x1000, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap().as_str(),
        DEADBEEF_LINE
    );
    assert_eq!(
        encode_data_record(0x7AF0, &[0x0A; 16]).unwrap().as_str(),
        FULL_LINE
    );
    assert_eq!(encode_end_record(0x0000).as_str(), END_LINE);
}

#[test]
fn test_encode_rejects_oversized_payload() {
    let data = [0u8; MAX_DATA_BYTES + 1];
    assert_eq!(
        encode_data_record(0, &data),
        Err(RecordError::PayloadTooLarge(17))
    );
}

// =============================================================================
// RecordError display tests
// =============================================================================

#[test]
fn test_record_error_display() {
    assert_eq!(
        RecordError::NotARecord.to_string(),
        "line does not start with 'S'"
    );
    assert_eq!(
        RecordError::ChecksumMismatch {
            expected: 0x12,
            computed: 0x34
        }
        .to_string(),
        "checksum mismatch: record says 0x12, computed 0x34"
    );
    assert_eq!(
        RecordError::AddressOutOfRange(0x1000).to_string(),
        "address 0x1000 outside the application region"
    );
    assert_eq!(
        RecordError::Overrun.to_string(),
        "line longer than the receive buffer"
    );
}
