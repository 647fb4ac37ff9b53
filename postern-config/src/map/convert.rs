//! Text conversions shared by directive bindings

use std::time::Duration;

/// Parse a duration such as `300ms`, `1h 30m` or `1h2m3s`, with the units
/// understood by [`humantime::parse_duration`].
///
/// A lone `0` needs no unit and `µs` is accepted for microseconds. Negative
/// durations are rejected.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let rest = rest.replace(['µ', 'μ'], "u");
    let duration =
        humantime::parse_duration(&rest).map_err(|e| format!("invalid duration {:?}: {}", text, e))?;

    if negative && !duration.is_zero() {
        return Err("duration must not be negative".to_string());
    }
    Ok(duration)
}

fn split_digits(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text.split_at(end)
}

/// Parse a data size such as `32M` or `1G 512M`.
///
/// Each space separated chunk is a number followed by `B` (or `b`), `K`,
/// `M` or `G`, all binary multiples; the chunks are summed. A number
/// without a unit is only accepted when it is zero.
pub fn parse_data_size(text: &str) -> Result<u64, String> {
    if text.trim().is_empty() {
        return Err("missing a number".to_string());
    }

    let mut total: u64 = 0;

    for chunk in text.split_whitespace() {
        let (digits, suffix) = split_digits(chunk);
        if digits.is_empty() {
            return Err(format!("missing a number before {:?}", suffix));
        }
        if suffix.contains(|c: char| c.is_ascii_digit()) {
            return Err("unexpected digit after a suffix".to_string());
        }

        let number: u64 = digits
            .parse()
            .map_err(|_| format!("number too large: {}", digits))?;
        let multiplier: u64 = match suffix {
            "G" => 1024 * 1024 * 1024,
            "M" => 1024 * 1024,
            "K" => 1024,
            "B" | "b" => 1,
            "" if number == 0 => 0,
            "" => return Err(format!("missing unit suffix after {}", number)),
            _ => return Err(format!("unknown unit suffix: {}", suffix)),
        };

        total = number
            .checked_mul(multiplier)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| format!("data size too large: {}", text))?;
    }

    Ok(total)
}

/// Parse `yes`/`no`, `on`/`off`, `true`/`false` or `1`/`0`, ignoring case
pub fn parse_bool(text: &str) -> Result<bool, String> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err("bool argument should be 'yes' or 'no'".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_units() {
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1h2m3s4ms5us6ns").unwrap(), Duration::new(3723, 4_005_006));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2µs").unwrap(), Duration::from_micros(2));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("-0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1").unwrap_err().contains("time unit needed"));
        assert!(parse_duration("1x").unwrap_err().contains("unknown time unit"));
        assert!(parse_duration("h").is_err());
        assert!(parse_duration(".s").is_err());
        assert_eq!(parse_duration("-1h").unwrap_err(), "duration must not be negative");
        assert!(parse_duration("1h-2m").is_err());
        assert!(parse_duration("99999999999999999999999h").is_err());
    }

    #[test]
    fn test_data_size() {
        assert_eq!(parse_data_size("32M").unwrap(), 32 * 1024 * 1024);
        assert_eq!(parse_data_size("1G 512M").unwrap(), (1024 + 512) * 1024 * 1024);
        assert_eq!(parse_data_size("10b 1B").unwrap(), 11);
        assert_eq!(parse_data_size("4K").unwrap(), 4096);
        assert_eq!(parse_data_size("0").unwrap(), 0);
    }

    #[test]
    fn test_data_size_errors() {
        assert!(parse_data_size("").is_err());
        assert!(parse_data_size("5").unwrap_err().contains("missing unit"));
        assert!(parse_data_size("5T").unwrap_err().contains("unknown unit suffix"));
        assert!(parse_data_size("5M5").is_err());
        assert!(parse_data_size("M").is_err());
        assert!(parse_data_size("99999999999999G").is_err());
    }

    #[test]
    fn test_bool() {
        for yes in ["yes", "On", "TRUE", "1"] {
            assert_eq!(parse_bool(yes), Ok(true));
        }
        for no in ["no", "off", "False", "0"] {
            assert_eq!(parse_bool(no), Ok(false));
        }
        assert!(parse_bool("maybe").is_err());
    }
}
