//! # Invoice Numbers
//!
//! Format: `{PREFIX}{YY}{MM}{seq:04}`, e.g. `INV25070042`.
//!
//! ```text
//!   INV   25   07   0042
//!   ───   ──   ──   ────
//!    │     │    │     └── per-period sequence, zero-padded to 4, grows past 9999
//!    │     │    └──────── month (UTC)
//!    │     └───────────── two-digit year (UTC)
//!    └─────────────────── configured prefix
//! ```
//!
//! The counter itself lives in the database (`invoice_sequences`) and is
//! keyed by the period prefix (`INV2507`), so each month restarts at 1.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::validation::ValidationResult;

const MAX_PREFIX_LEN: usize = 10;

/// The counter key for a moment in time: prefix + `YYMM`.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use tillbook_core::invoice::period_prefix;
///
/// let at = Utc.with_ymd_and_hms(2025, 7, 14, 9, 30, 0).unwrap();
/// assert_eq!(period_prefix("INV", at), "INV2507");
/// ```
pub fn period_prefix(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}{}", prefix, at.format("%y%m"))
}

/// Joins a period prefix and a sequence number.
///
/// ## Example
/// ```rust
/// use tillbook_core::invoice::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV2507", 42), "INV25070042");
/// assert_eq!(format_invoice_number("INV2507", 12345), "INV250712345");
/// ```
pub fn format_invoice_number(period_prefix: &str, seq: i64) -> String {
    format!("{}{:04}", period_prefix, seq)
}

/// Extracts the sequence from an invoice number issued under `period_prefix`.
pub fn parse_sequence(invoice_number: &str, period_prefix: &str) -> Option<i64> {
    invoice_number
        .strip_prefix(period_prefix)
        .filter(|digits| digits.len() >= 4 && digits.chars().all(|c| c.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}

/// Validates a configured prefix: 1 to 10 uppercase ASCII letters.
pub fn validate_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "invoice_prefix".to_string(),
        });
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }
    if !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_prefix".to_string(),
            reason: "must be uppercase ASCII letters".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_prefix_uses_two_digit_year_and_month() {
        let at = Utc.with_ymd_and_hms(2031, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(period_prefix("INV", at), "INV3101");
    }

    #[test]
    fn test_format_pads_to_four() {
        assert_eq!(format_invoice_number("INV2507", 1), "INV25070001");
        assert_eq!(format_invoice_number("INV2507", 9999), "INV25079999");
        assert_eq!(format_invoice_number("INV2507", 10000), "INV250710000");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("INV25070042", "INV2507"), Some(42));
        assert_eq!(parse_sequence("INV250710000", "INV2507"), Some(10000));
        assert_eq!(parse_sequence("INV25080042", "INV2507"), None);
        assert_eq!(parse_sequence("INV2507004", "INV2507"), None);
    }

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("INV").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("inv").is_err());
        assert!(validate_prefix("ABCDEFGHIJK").is_err());
    }
}
