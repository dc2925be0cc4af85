/// Parse a recorded measurement into a comparable number.
///
/// Accepts plain decimals (`"12.34"`) and clock-style times (`"1:23.45"`,
/// read as seconds). Blank, non-numeric and non-finite input yields `None`.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let value = match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.trim().parse().ok()?;
            let seconds: f64 = seconds.trim().parse().ok()?;
            if seconds < 0.0 {
                return None;
            }
            f64::from(minutes) * 60.0 + seconds
        }
        None => raw.parse().ok()?,
    };

    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_decimals() {
        assert_eq!(parse_measurement("12.3"), Some(12.3));
        assert_eq!(parse_measurement(" 7 "), Some(7.0));
    }

    #[test]
    fn clock_times_become_seconds() {
        assert_eq!(parse_measurement("1:23.5"), Some(83.5));
        assert_eq!(parse_measurement("0:09.8"), Some(9.8));
    }

    #[test]
    fn garbage_is_not_a_measurement() {
        assert_eq!(parse_measurement(""), None);
        assert_eq!(parse_measurement("   "), None);
        assert_eq!(parse_measurement("DNF"), None);
        assert_eq!(parse_measurement("1:xx"), None);
        assert_eq!(parse_measurement("-1:10"), None);
        assert_eq!(parse_measurement("NaN"), None);
        assert_eq!(parse_measurement("inf"), None);
    }
}
