//! # Receipt Number Format
//!
//! Pure formatting and parsing of receipt numbers.
//!
//! ## Format
//! ```text
//! YYYYMMDD-NNNN
//! ────┬─── ──┬─
//!     │      └── 4-digit zero-padded sequence, per calendar day,
//!     │          starting at 0001
//!     └── service date
//!
//! Example: 20260115-0042
//! ```
//!
//! The stateful daily counter that allocates sequences lives in
//! salon-store; this module only knows the shape of the number.

use chrono::NaiveDate;

/// Highest sequence a single day can carry. The 10000th receipt of a
/// day fails loudly with `SequenceExhausted` rather than wrapping.
pub const MAX_DAILY_SEQUENCE: u32 = 9999;

/// Formats a receipt number for the given date and sequence.
///
/// Callers must hand in a sequence in `1..=MAX_DAILY_SEQUENCE`; the
/// allocating counter enforces that bound.
pub fn format_receipt_number(date: NaiveDate, seq: u32) -> String {
    debug_assert!((1..=MAX_DAILY_SEQUENCE).contains(&seq));
    format!("{}-{:04}", date.format("%Y%m%d"), seq)
}

/// Parses a `YYYYMMDD-NNNN` receipt number back into its parts.
///
/// Returns `None` for anything that is not exactly the issued shape,
/// including sequence 0000 (sequences start at 0001).
pub fn parse_receipt_number(number: &str) -> Option<(NaiveDate, u32)> {
    let (date_part, seq_part) = number.split_once('-')?;
    if date_part.len() != 8 || seq_part.len() != 4 {
        return None;
    }
    if !seq_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
    let seq: u32 = seq_part.parse().ok()?;
    if !(1..=MAX_DAILY_SEQUENCE).contains(&seq) {
        return None;
    }

    Some((date, seq))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_zero_pads_sequence() {
        assert_eq!(format_receipt_number(date(2026, 1, 15), 1), "20260115-0001");
        assert_eq!(format_receipt_number(date(2026, 1, 15), 42), "20260115-0042");
        assert_eq!(
            format_receipt_number(date(2026, 12, 31), MAX_DAILY_SEQUENCE),
            "20261231-9999"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let number = format_receipt_number(date(2026, 3, 7), 123);
        assert_eq!(parse_receipt_number(&number), Some((date(2026, 3, 7), 123)));
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert_eq!(parse_receipt_number(""), None);
        assert_eq!(parse_receipt_number("20260115"), None);
        assert_eq!(parse_receipt_number("20260115-0000"), None); // starts at 0001
        assert_eq!(parse_receipt_number("20260115-001"), None); // not 4 digits
        assert_eq!(parse_receipt_number("20260115-00001"), None);
        assert_eq!(parse_receipt_number("20261315-0001"), None); // month 13
        assert_eq!(parse_receipt_number("2026011x-0001"), None);
        assert_eq!(parse_receipt_number("20260115-00a1"), None);
    }
}
