//! Per-day storage keys: `<prefix><YYYY-MM-DD>`.
use chrono::NaiveDate;

use crate::constants::DAY_KEY_FORMAT;

#[must_use]
pub fn day_key(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}", date.format(DAY_KEY_FORMAT))
}

/// Recover the date embedded in a key, ignoring keys that belong to someone else.
#[must_use]
pub fn parse_day_key(prefix: &str, key: &str) -> Option<NaiveDate> {
    key.strip_prefix(prefix).and_then(parse_date)
}

#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DAY_KEY_FORMAT).ok()
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_KEY_PREFIX;

    #[test]
    fn day_key_roundtrips_through_parse() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let key = day_key(DEFAULT_KEY_PREFIX, date);
        assert_eq!(key, "reelday.state.2024-02-29");
        assert_eq!(parse_day_key(DEFAULT_KEY_PREFIX, &key), Some(date));
    }

    #[test]
    fn foreign_and_malformed_keys_are_ignored() {
        assert_eq!(parse_day_key(DEFAULT_KEY_PREFIX, "theme"), None);
        assert_eq!(
            parse_day_key(DEFAULT_KEY_PREFIX, "reelday.state.2024-13-01"),
            None
        );
        assert_eq!(parse_day_key(DEFAULT_KEY_PREFIX, "other.2024-01-01"), None);
    }
}
