use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{LoadError, Result};

/// Parses a k6-style duration: a bare number of seconds (`"300"`) or a
/// sequence of `<number><unit>` pairs with units `ms`, `s`, `m`, `h`
/// (`"5m"`, `"1m30s"`).
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(LoadError::InvalidDuration(input.to_string()));
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(LoadError::InvalidDuration(input.to_string()));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| LoadError::InvalidDuration(input.to_string()))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(60 * 60).map(Duration::from_secs),
            _ => return Err(LoadError::InvalidDuration(input.to_string())),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| LoadError::InvalidDuration(input.to_string()))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

/// Whole seconds of a duration string; sub-second remainders are dropped.
pub fn parse_duration_secs(input: &str) -> Result<u64> {
    parse_duration(input).map(|d| d.as_secs())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SecondsOrString {
    Seconds(u64),
    Text(String),
}

/// Serde helper so config files may say `"duration": 300` or `"duration": "5m"`.
pub fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SecondsOrString::deserialize(deserializer)? {
        SecondsOrString::Seconds(secs) => Ok(secs),
        SecondsOrString::Text(text) => {
            parse_duration_secs(&text).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn k6_style_units() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "m", "5x", "5m3", "-5s", "1.5m"] {
            assert!(parse_duration(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn overflowing_durations_are_errors() {
        assert!(matches!(
            parse_duration("999999999999999999h"),
            Err(LoadError::InvalidDuration(_))
        ));
        assert!(parse_duration("18446744073709551615s1s").is_err());
        assert!(parse_duration("99999999999999999999s").is_err());
    }

    #[test]
    fn secs_truncates_millis() {
        assert_eq!(parse_duration_secs("2500ms").unwrap(), 2);
    }
}
