use super::MS_PER_DAY;
use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds since midnight, always within `[0, 86_400_000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Time {
    ms: u32,
}

impl Time {
    pub const MIDNIGHT: Time = Time { ms: 0 };

    pub fn from_milliseconds(ms: i64) -> Option<Self> {
        (0..MS_PER_DAY)
            .contains(&ms)
            .then_some(Self { ms: ms as u32 })
    }

    pub fn from_hms_opt(hour: u32, minute: u32, second: u32) -> Option<Self> {
        Self::from_hms_milli_opt(hour, minute, second, 0)
    }

    pub fn from_hms_milli_opt(hour: u32, minute: u32, second: u32, milli: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 || second >= 60 || milli >= 1000 {
            return None;
        }
        let ms = ((hour * 60 + minute) * 60 + second) * 1000 + milli;
        Some(Self { ms })
    }

    pub fn milliseconds(self) -> i64 {
        self.ms as i64
    }

    pub fn hour(self) -> u32 {
        self.ms / 3_600_000
    }

    pub fn minute(self) -> u32 {
        self.ms / 60_000 % 60
    }

    pub fn second(self) -> u32 {
        self.ms / 1000 % 60
    }

    pub fn millisecond(self) -> u32 {
        self.ms % 1000
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_clock(self.milliseconds()))
    }
}

impl FromStr for Time {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = parse_clock(s, "time")?;
        Self::from_milliseconds(ms)
            .ok_or_else(|| FormatError::new("time", s, "24:00 is not a time of day"))
    }
}

impl From<Time> for String {
    fn from(time: Time) -> Self {
        time.to_string()
    }
}

impl TryFrom<String> for Time {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Formats a clock offset as `HH:MM`, adding `:SS` and `.mmm` only when
/// they are non-zero. Accepts `24:00` for end-of-day boundaries.
pub(crate) fn format_clock(ms: i64) -> String {
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1000 % 60;
    let millis = ms % 1000;
    if millis != 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    } else if seconds != 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}")
    }
}

/// Parses `H:MM`, `HH:MM:SS` or `HH:MM:SS.mmm` into milliseconds since
/// midnight. `24:00` is accepted and yields one full day.
pub(crate) fn parse_clock(input: &str, what: &'static str) -> Result<i64, FormatError> {
    let text = input.trim();
    let err = |reason: &str| FormatError::new(what, input, reason);
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(err("expected HH:MM or HH:MM:SS"));
    }
    let number = |part: &str, max_len: usize| -> Result<i64, FormatError> {
        if part.is_empty() || part.len() > max_len || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(err("expected digits"));
        }
        part.parse::<i64>().map_err(|_| err("expected digits"))
    };

    let hours = number(parts[0], 2)?;
    if parts[1].len() != 2 {
        return Err(err("minutes need two digits"));
    }
    let minutes = number(parts[1], 2)?;
    let (seconds, millis) = match parts.get(2) {
        None => (0, 0),
        Some(rest) => match rest.split_once('.') {
            Some((secs, frac)) if frac.len() == 3 => (number(secs, 2)?, number(frac, 3)?),
            Some(_) => return Err(err("milliseconds need three digits")),
            None => (number(rest, 2)?, 0),
        },
    };

    if minutes >= 60 || seconds >= 60 {
        return Err(err("minutes and seconds must be below 60"));
    }
    let ms = ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis;
    if ms > MS_PER_DAY {
        return Err(err("beyond 24:00"));
    }
    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_text_round_trips() {
        for text in ["08:00", "17:30", "23:59:59", "00:00:01.250"] {
            let time: Time = text.parse().unwrap();
            assert_eq!(time.to_string(), text);
        }
    }

    #[test]
    fn end_of_day_is_only_a_boundary() {
        assert_eq!(parse_clock("24:00", "period end").unwrap(), MS_PER_DAY);
        assert!("24:00".parse::<Time>().is_err());
        assert!(parse_clock("24:01", "time").is_err());
        assert!(parse_clock("7:5", "time").is_err());
        assert!(parse_clock("noon", "time").is_err());
    }

    #[test]
    fn components() {
        let time = Time::from_hms_milli_opt(13, 5, 9, 42).unwrap();
        assert_eq!(
            (time.hour(), time.minute(), time.second(), time.millisecond()),
            (13, 5, 9, 42)
        );
        assert!(Time::from_hms_opt(24, 0, 0).is_none());
    }
}
