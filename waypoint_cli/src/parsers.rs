use jiff::SpanRelativeTo;
use waypoint_optimizer::solver::solver_params::Threads;

/// Accepts "30s", "5m", ISO 8601 ("PT1H30M") or a number of seconds.
pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(format!("invalid duration {input:?}"))
}

/// "auto", "1" or any positive thread count.
pub fn parse_threads(input: &str) -> Result<Threads, String> {
    if input.eq_ignore_ascii_case("auto") {
        return Ok(Threads::Auto);
    }

    match input.parse::<usize>() {
        Ok(0) => Err(String::from("thread count must be positive")),
        Ok(1) => Ok(Threads::Single),
        Ok(n) => Ok(Threads::Multi(n)),
        Err(_) => Err(format!("invalid thread count {input:?}")),
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Ok(SignedDuration::from_secs(30)));
        assert_eq!(parse_duration("PT1M"), Ok(SignedDuration::from_mins(1)));
        assert_eq!(parse_duration("90"), Ok(SignedDuration::from_secs(90)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads("auto"), Ok(Threads::Auto));
        assert_eq!(parse_threads("1"), Ok(Threads::Single));
        assert_eq!(parse_threads("4"), Ok(Threads::Multi(4)));
        assert!(parse_threads("0").is_err());
    }
}
