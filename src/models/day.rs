use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Day of the week a class meets on.
///
/// Stored and serialized as lowercase English. Parsing also accepts the
/// Indonesian names used by the registrar (`senin` .. `minggu`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[sqlx(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown day: {0}")]
pub struct ParseDayError(pub String);

impl Day {
    /// Days on which classes may be placed.
    pub const TEACHING_DAYS: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = ParseDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "mon" | "senin" => Ok(Day::Monday),
            "tuesday" | "tue" | "selasa" => Ok(Day::Tuesday),
            "wednesday" | "wed" | "rabu" => Ok(Day::Wednesday),
            "thursday" | "thu" | "kamis" => Ok(Day::Thursday),
            "friday" | "fri" | "jumat" | "jum'at" => Ok(Day::Friday),
            "saturday" | "sat" | "sabtu" => Ok(Day::Saturday),
            "sunday" | "sun" | "minggu" => Ok(Day::Sunday),
            _ => Err(ParseDayError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Day {
    type Error = ParseDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_english_and_indonesian_names() {
        assert_eq!("Monday".parse::<Day>(), Ok(Day::Monday));
        assert_eq!("senin".parse::<Day>(), Ok(Day::Monday));
        assert_eq!(" JUMAT ".parse::<Day>(), Ok(Day::Friday));
        assert_eq!("sabtu".parse::<Day>(), Ok(Day::Saturday));
        assert!("someday".parse::<Day>().is_err());
    }

    #[test]
    fn serializes_lowercase_and_deserializes_aliases() {
        let json = serde_json::to_string(&Day::Wednesday).unwrap();
        assert_eq!(json, "\"wednesday\"");

        let day: Day = serde_json::from_str("\"Rabu\"").unwrap();
        assert_eq!(day, Day::Wednesday);
    }

    #[test]
    fn orders_from_monday() {
        assert!(Day::Monday < Day::Tuesday);
        assert!(Day::Saturday < Day::Sunday);
    }
}
