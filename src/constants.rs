/// Column headers of the fixture CSV and the constants shared across stages

// CSV headers as published in the fixture download
pub const COL_MATCH_NUMBER: &str = "Match Number";
pub const COL_ROUND_NUMBER: &str = "Round Number";
pub const COL_DATE: &str = "Date";
pub const COL_LOCATION: &str = "Location";
pub const COL_HOME_TEAM: &str = "Home Team";
pub const COL_AWAY_TEAM: &str = "Away Team";
pub const COL_GROUP: &str = "Group";
pub const COL_RESULT: &str = "Result";

/// Headers the extractor refuses to run without
pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_MATCH_NUMBER,
    COL_ROUND_NUMBER,
    COL_DATE,
    COL_LOCATION,
    COL_HOME_TEAM,
    COL_AWAY_TEAM,
    COL_GROUP,
    COL_RESULT,
];

/// Kickoff format in the `Date` column, e.g. `21/12/2025 20:00`
pub const KICKOFF_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Text form of `match_time` for stores without a native TIME type
pub const MATCH_TIME_FORMAT: &str = "%H:%M:%S";

pub const DEFAULT_CSV_PATH: &str = "data/afcon-2025-MoroccoStandardTime.csv";
pub const DEFAULT_SQLITE_PATH: &str = "data/afcon.db";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub const MATCHES_TABLE: &str = "matches";
