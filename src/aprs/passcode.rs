//! APRS-IS passcode derivation.
//!
//! The passcode is a 15-bit hash of the base callsign (SSID removed, upper-cased).
//! Servers compare it against the `pass` field of the login line to decide whether
//! a connection is verified and allowed to inject packets.

/// Passcode value that marks a read-only (receive-only) login.
pub const READ_ONLY_PASSCODE: &str = "-1";

const HASH_SEED: u32 = 0x73e2;

/// Compute the APRS-IS passcode for `callsign`.
///
/// Anything after the first `-` (the SSID) is ignored, so `N0CALL` and `N0CALL-9`
/// yield the same value. The result is always in `0..=32767`.
///
/// Characters are taken as UTF-16 code units, the unit every published
/// implementation hashes; for ASCII callsigns this is the byte value.
pub fn calculate_passcode(callsign: &str) -> u16 {
    let base = callsign.split('-').next().unwrap_or_default().to_uppercase();
    let units: Vec<u32> = base.encode_utf16().map(u32::from).collect();
    let mut hash = HASH_SEED;
    for pair in units.chunks(2) {
        hash ^= pair[0] << 8;
        if let Some(&low) = pair.get(1) {
            hash ^= low;
        }
    }
    (hash & 0x7fff) as u16
}

/// True when `passcode` is the read-only sentinel.
pub fn is_read_only(passcode: &str) -> bool {
    passcode.trim() == READ_ONLY_PASSCODE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_length_callsign_uses_high_byte_only_for_last_char() {
        // "A": 0x73e2 ^ (0x41 << 8) = 0x32e2
        assert_eq!(calculate_passcode("A"), 0x32e2);
    }

    #[test]
    fn empty_callsign_is_seed() {
        assert_eq!(calculate_passcode(""), 0x73e2 & 0x7fff);
    }

    #[test]
    fn non_ascii_hashes_per_utf16_unit() {
        // U+00C9 is one unit (0xC9), not the two UTF-8 bytes C3 89.
        assert_eq!(calculate_passcode("é"), (0x73e2 ^ 0xc900) & 0x7fff);
        // Units above 0xFF spill past bit 15 and are masked off.
        assert_eq!(calculate_passcode("中"), 0x5ee2);
    }

    #[test]
    fn sentinel_detection_trims() {
        assert!(is_read_only("-1"));
        assert!(is_read_only(" -1 "));
        assert!(!is_read_only("13023"));
    }
}
