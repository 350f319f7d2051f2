use crate::constants::*;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data line of the fixture CSV, before any normalization.
///
/// Empty fields deserialize to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawMatch {
    #[serde(rename = "Match Number")]
    pub match_number: i32,
    #[serde(rename = "Round Number")]
    pub round_number: Option<i32>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Home Team")]
    pub home_team: Option<String>,
    #[serde(rename = "Away Team")]
    pub away_team: Option<String>,
    #[serde(rename = "Group")]
    pub group: Option<String>,
    #[serde(rename = "Result")]
    pub result: Option<String>,
}

/// The fixture file as read from disk: headers in file order plus one row per line
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Where the rows came from, used for diagnostics only
    pub origin: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawMatch>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.headers.len())
    }

    pub fn columns(&self) -> &[String] {
        &self.headers
    }

    pub fn head(&self, n: usize) -> &[RawMatch] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// A cleaned row, shaped exactly like the `matches` table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_number: i32,
    pub round_number: Option<i32>,
    pub match_year: Option<i32>,
    pub match_month: Option<i32>,
    pub match_day: Option<i32>,
    pub match_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub group_name: Option<String>,
    pub result: Option<String>,
}

impl MatchRecord {
    /// `match_time` in the text form used by stores without a TIME type
    pub fn match_time_text(&self) -> Option<String> {
        self.match_time
            .map(|t| t.format(MATCH_TIME_FORMAT).to_string())
    }
}

/// Counters collected while cleaning a raw table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    pub raw_rows: usize,
    pub unparsed_dates: usize,
    pub duplicates_removed: usize,
    /// Match numbers that appear on more than one distinct row
    pub conflicting_keys: Vec<i32>,
}

/// Output of the transform stage
#[derive(Debug, Clone, Default)]
pub struct CleanTable {
    pub rows: Vec<MatchRecord>,
    pub stats: TransformStats,
}

impl CleanTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of one committed load
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub backend: String,
    pub rows_written: usize,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(match_number: i32) -> RawMatch {
        RawMatch {
            match_number,
            round_number: Some(1),
            date: Some("21/12/2025 20:00".to_string()),
            location: Some("Rabat".to_string()),
            home_team: Some("Morocco".to_string()),
            away_team: Some("Comoros".to_string()),
            group: Some("Group A".to_string()),
            result: None,
        }
    }

    #[test]
    fn head_is_clamped_to_row_count() {
        let table = RawTable {
            origin: "memory".to_string(),
            headers: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![raw(1), raw(2)],
        };

        assert_eq!(table.shape(), (2, 8));
        assert_eq!(table.head(5).len(), 2);
        assert_eq!(table.head(1)[0].match_number, 1);
        assert_eq!(table.columns()[0], COL_MATCH_NUMBER);
    }

    #[test]
    fn match_time_text_uses_seconds() {
        let record = MatchRecord {
            match_number: 1,
            round_number: None,
            match_year: None,
            match_month: None,
            match_day: None,
            match_time: NaiveTime::from_hms_opt(18, 0, 0),
            location: None,
            home_team: None,
            away_team: None,
            group_name: None,
            result: None,
        };
        assert_eq!(record.match_time_text().as_deref(), Some("18:00:00"));
    }
}
