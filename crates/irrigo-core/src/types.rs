use chrono::{DateTime, Local, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{IrrigoError, Result};

/// Logical valve identifier used by schedules, names and the action log.
pub type ValveId = u32;

/// The relay controller's own channel (pin) number.
pub type PhysicalId = u32;

/// Longest accepted watering run. A full day would put the OFF trigger on the
/// same weekday and minute as the ON trigger.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60 - 1;

/// Commands understood by the relay controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    On,
    Off,
    Status,
    Uptime,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::On => "on",
            Command::Off => "off",
            Command::Status => "status",
            Command::Uptime => "uptime",
        }
    }

    /// `on`/`off` carry a valve list and are recorded in the action log.
    pub fn is_switch(&self) -> bool {
        matches!(self, Command::On | Command::Off)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "on" => Ok(Command::On),
            "off" => Ok(Command::Off),
            "status" => Ok(Command::Status),
            "uptime" => Ok(Command::Uptime),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// Wall-clock time of day, serialised as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(IrrigoError::InvalidEntry(format!(
                "time out of range: {hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    /// Add `minutes`, wrapping on a 24-hour clock.
    ///
    /// The flag is true when the result lands on a later calendar day.
    pub fn wrapping_add_minutes(&self, minutes: u32) -> (ClockTime, bool) {
        let total = self.minutes_since_midnight() + minutes;
        let wrapped = total % (24 * 60);
        let time = ClockTime {
            hour: (wrapped / 60) as u8,
            minute: (wrapped % 60) as u8,
        };
        (time, total >= 24 * 60)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for ClockTime {
    type Err = IrrigoError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || IrrigoError::InvalidEntry(format!("invalid time (expected HH:MM): {s}"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        ClockTime::new(hour, minute)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a day-of-week name (`monday`, `Mon`, ...). Case-insensitive.
pub fn parse_weekday(day: &str) -> Option<Weekday> {
    day.trim().parse::<Weekday>().ok()
}

/// Canonical display name for a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One weekly watering slot.
///
/// `day` is kept as text so that rows written by older versions (or edited by
/// hand) with an unrecognised day survive loading; the compiler skips them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: String,
    pub start: ClockTime,
    pub duration_minutes: u32,
    pub valves: Vec<ValveId>,
}

impl ScheduleEntry {
    pub fn weekday(&self) -> Option<Weekday> {
        parse_weekday(&self.day)
    }

    /// Duration lies in `1..=MAX_DURATION_MINUTES`.
    pub fn has_valid_duration(&self) -> bool {
        (1..=MAX_DURATION_MINUTES).contains(&self.duration_minutes)
    }

    /// When the OFF command falls, and whether it crossed midnight.
    pub fn end(&self) -> (ClockTime, bool) {
        self.start.wrapping_add_minutes(self.duration_minutes)
    }

    /// Validate an operator-submitted entry and normalise it: canonical day
    /// name, valve list de-duplicated in first-seen order.
    pub fn normalized(mut self) -> Result<Self> {
        let weekday = self
            .weekday()
            .ok_or_else(|| IrrigoError::InvalidEntry(format!("unknown day of week: {}", self.day)))?;
        if !self.has_valid_duration() {
            return Err(IrrigoError::InvalidEntry(format!(
                "duration must be between 1 and {MAX_DURATION_MINUTES} minutes, got {}",
                self.duration_minutes
            )));
        }
        let mut seen = Vec::with_capacity(self.valves.len());
        for v in std::mem::take(&mut self.valves) {
            if !seen.contains(&v) {
                seen.push(v);
            }
        }
        if seen.is_empty() {
            return Err(IrrigoError::InvalidEntry(
                "at least one valve must be selected".to_string(),
            ));
        }
        self.day = weekday_name(weekday).to_string();
        self.valves = seen;
        Ok(self)
    }
}

/// A single issued on/off command, as recorded in the action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Local>,
    pub action: Command,
    pub valves: Vec<ValveId>,
}

impl ActionLogEntry {
    pub fn now(action: Command, valves: &[ValveId]) -> Self {
        Self {
            timestamp: Local::now(),
            action,
            valves: valves.to_vec(),
        }
    }
}
