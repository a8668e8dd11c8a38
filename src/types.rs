use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Contest history (as served by the history endpoint)
// ---------------------------------------------------------------------------

/// One entry of a user's contest history, oldest first in the source array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContestRecord {
    #[serde(default)]
    pub contest_name: String,
    /// ISO-8601 timestamp. An empty string is treated the same as absent.
    #[serde(default)]
    pub end_time: Option<String>,
    /// Null for some unrated first participations.
    #[serde(default)]
    pub old_rating: Option<i64>,
    pub new_rating: i64,
    pub place: i64,
    pub performance: i64,
    #[serde(default = "default_is_rated")]
    pub is_rated: bool,
}

fn default_is_rated() -> bool {
    true
}

impl ContestRecord {
    pub fn end_time(&self) -> Option<&str> {
        self.end_time.as_deref().filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// Jan–Mar, labelled with the previous year.
    Winter(i32),
    Spring(i32),
    Summer(i32),
    Autumn(i32),
    /// No EndTime on the record.
    Unknown,
}

impl Season {
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        match date.month() {
            1..=3 => Season::Winter(year - 1),
            4..=6 => Season::Spring(year),
            7..=9 => Season::Summer(year),
            _ => Season::Autumn(year),
        }
    }

    /// Chronological key; winter sorts after the autumn of its labelled year.
    pub fn sort_key(&self) -> Option<(i32, u8)> {
        match *self {
            Season::Spring(y) => Some((y, 0)),
            Season::Summer(y) => Some((y, 1)),
            Season::Autumn(y) => Some((y, 2)),
            Season::Winter(y) => Some((y, 3)),
            Season::Unknown => None,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Winter(y) => write!(f, "{y}winter"),
            Season::Spring(y) => write!(f, "{y}spring"),
            Season::Summer(y) => write!(f, "{y}summer"),
            Season::Autumn(y) => write!(f, "{y}autumn"),
            Season::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for Season {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Derived record
// ---------------------------------------------------------------------------

/// A contest of the tracked series, with the running-maximum fields filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedRecord {
    pub abc: i64,
    pub general_place: i64,
    pub old_rating: Option<i64>,
    pub new_rating: i64,
    /// Highest NewRating across the whole history up to and including this contest.
    pub highest: i64,
    pub performance: i64,
    pub season: Season,
    /// How much this contest raised `highest` (0 if it did not).
    pub update_highest: i64,
}
