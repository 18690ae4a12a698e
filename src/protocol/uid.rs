//! Card UID normalisation for outbound commands.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{BridgeError, Result};

/// Shortest and longest UIDs an ISO 14443 reader reports.
const MIN_UID_BYTES: usize = 4;
const MAX_UID_BYTES: usize = 10;

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s:\-]").expect("Invalid regex pattern"))
}

/// Renders a user-typed UID in the device's canonical `AA:BB:CC:DD` form.
///
/// Bytes may be separated by colons, dashes, whitespace or nothing at all.
///
/// ```
/// use card_bridge::protocol::uid::canonical_uid;
///
/// assert_eq!(canonical_uid("de ad be ef").unwrap(), "DE:AD:BE:EF");
/// assert_eq!(canonical_uid("04a1b2c3d4e5f6").unwrap(), "04:A1:B2:C3:D4:E5:F6");
/// ```
pub fn canonical_uid(raw: &str) -> Result<String> {
    let digits = separators().replace_all(raw, "");
    let bytes = hex::decode(digits.as_bytes())
        .map_err(|e| BridgeError::invalid_command(format!("UID '{raw}': {e}")))?;
    if !(MIN_UID_BYTES..=MAX_UID_BYTES).contains(&bytes.len()) {
        return Err(BridgeError::invalid_command(format!(
            "UID '{raw}' has {} bytes, expected {MIN_UID_BYTES} to {MAX_UID_BYTES}",
            bytes.len()
        )));
    }
    Ok(bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_forms() {
        assert_eq!(canonical_uid("AA:BB:CC:DD").unwrap(), "AA:BB:CC:DD");
        assert_eq!(canonical_uid("aa-bb-cc-dd").unwrap(), "AA:BB:CC:DD");
        assert_eq!(canonical_uid(" aabbccdd ").unwrap(), "AA:BB:CC:DD");
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!(matches!(
            canonical_uid("ZZ:BB:CC:DD"),
            Err(BridgeError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_rejects_odd_digit_count() {
        assert!(canonical_uid("AAB:CC:DD").is_err());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(canonical_uid("AA:BB").is_err());
        assert!(canonical_uid("00112233445566778899AA").is_err());
    }
}
