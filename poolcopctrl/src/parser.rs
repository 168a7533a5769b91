use std::time::Duration;

pub(crate) fn parse_timeout(arg: &str) -> Result<Duration, String> {
    parse_duration::parse(arg).map_err(|err| format!("Not a valid timeout: {err}"))
}

pub(crate) fn parse_pump_speed(arg: &str) -> Result<u8, String> {
    match arg.parse::<u8>() {
        Ok(speed @ 1..=3) => Ok(speed),
        _ => Err("Pump speed must be 1, 2 or 3".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts() {
        assert_eq!(parse_timeout("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_timeout("500ms").unwrap(), Duration::from_millis(500));
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn pump_speeds() {
        assert_eq!(parse_pump_speed("1").unwrap(), 1);
        assert_eq!(parse_pump_speed("3").unwrap(), 3);
        assert!(parse_pump_speed("0").is_err());
        assert!(parse_pump_speed("4").is_err());
        assert!(parse_pump_speed("fast").is_err());
    }
}
