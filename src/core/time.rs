//! Shared timestamp helpers.

use chrono::Utc;
use ulid::Ulid;

/// Current time as milliseconds since the Unix epoch, the unit notes are stamped with.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time rendered as an ISO-8601 string, the unit views are stamped with.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

/// A short, lowercase alphanumeric identifier suitable for the random suffix of a note id.
///
/// Built from a ULID's randomness rather than a fresh RNG dependency: a ULID already mixes
/// timestamp and random bits, so the tail of its Crockford base32 encoding is effectively
/// random and collision-resistant enough for a suffix disambiguating same-millisecond saves.
pub fn short_random_suffix() -> String {
    let ulid = Ulid::new().to_string().to_lowercase();
    ulid.chars().rev().take(8).collect::<Vec<_>>().into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_epoch_ms_is_positive_and_recent() {
        let ms = now_epoch_ms();
        assert!(ms > 1_700_000_000_000);
    }

    #[test]
    fn now_iso8601_parses_as_rfc3339() {
        let s = now_iso8601();
        assert!(chrono::DateTime::parse_from_rfc3339(&s).is_ok());
    }

    #[test]
    fn short_random_suffix_is_lowercase_alphanumeric() {
        let s = short_random_suffix();
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn short_random_suffix_is_not_constant() {
        let a = short_random_suffix();
        let b = short_random_suffix();
        assert_ne!(a, b);
    }
}
