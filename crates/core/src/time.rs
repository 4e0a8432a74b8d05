use chrono::{DateTime, Duration, Local, TimeZone, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Placeholder rendered when a timestamp is unknown.
pub const MISSING_TIME: &str = "—";

/// Full timestamp (`YYYY/MM/DD hh:mm:ss`) in the local timezone.
#[must_use]
pub fn format_full_time(at: Option<DateTime<Utc>>) -> String {
    format_full_time_in(at, &Local)
}

/// Full timestamp (`YYYY/MM/DD hh:mm:ss`) in the given timezone.
#[must_use]
pub fn format_full_time_in<Tz>(at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match at {
        Some(at) => at
            .with_timezone(tz)
            .format("%Y/%m/%d %H:%M:%S")
            .to_string(),
        None => MISSING_TIME.to_owned(),
    }
}

/// Compact relative age used in list rows: `NOW`, `5M`, `3H`, `2D`, `4MO`, `1YR`.
#[must_use]
pub fn format_ticker_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return MISSING_TIME.to_owned();
    };
    let secs = (now - at).num_seconds().unsigned_abs();
    match secs {
        0..60 => "NOW".to_owned(),
        60..3_600 => format!("{}M", secs / 60),
        3_600..86_400 => format!("{}H", secs / 3_600),
        86_400..2_592_000 => format!("{}D", secs / 86_400),
        2_592_000..31_536_000 => format!("{}MO", secs / 2_592_000),
        _ => format!("{}YR", secs / 31_536_000),
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_time_uses_slashes_and_padding() {
        assert_eq!(
            format_full_time_in(Some(fixed_now()), &Utc),
            "2023/11/14 22:13:20"
        );
        assert_eq!(format_full_time_in(None, &Utc), "—");
    }

    #[test]
    fn ticker_time_buckets() {
        let now = fixed_now();
        let at = |secs: i64| Some(now - Duration::seconds(secs));
        assert_eq!(format_ticker_time(at(5), now), "NOW");
        assert_eq!(format_ticker_time(at(125), now), "2M");
        assert_eq!(format_ticker_time(at(3 * 3_600), now), "3H");
        assert_eq!(format_ticker_time(at(2 * 86_400), now), "2D");
        assert_eq!(format_ticker_time(at(65 * 86_400), now), "2MO");
        assert_eq!(format_ticker_time(at(400 * 86_400), now), "1YR");
        assert_eq!(format_ticker_time(None, now), "—");
    }

    #[test]
    fn ticker_time_is_symmetric_for_future_timestamps() {
        let now = fixed_now();
        assert_eq!(format_ticker_time(Some(now + Duration::seconds(120)), now), "2M");
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(30));
    }
}
