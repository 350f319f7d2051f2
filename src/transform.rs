use crate::constants::KICKOFF_FORMAT;
use crate::types::{CleanTable, MatchRecord, RawMatch, RawTable, TransformStats};
use chrono::{Datelike, NaiveDateTime, NaiveTime};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument, warn};

/// Clean a raw table into rows shaped like the `matches` table.
///
/// Never fails: a kickoff that does not parse leaves the four derived
/// temporal fields null, and blank text becomes null. Fully identical rows
/// are dropped after the first occurrence; row order is otherwise preserved.
#[instrument(skip_all, fields(origin = %raw.origin, rows = raw.rows.len()))]
pub fn transform_matches(raw: RawTable) -> CleanTable {
    let mut stats = TransformStats {
        raw_rows: raw.rows.len(),
        ..Default::default()
    };

    let mut seen: HashSet<MatchRecord> = HashSet::with_capacity(raw.rows.len());
    let mut keys: HashSet<i32> = HashSet::with_capacity(raw.rows.len());
    let mut conflicting: BTreeSet<i32> = BTreeSet::new();
    let mut rows = Vec::with_capacity(raw.rows.len());

    for raw_match in raw.rows {
        let kickoff = raw_match.date.as_deref().and_then(parse_kickoff);
        if kickoff.is_none() {
            stats.unparsed_dates += 1;
            warn!(
                match_number = raw_match.match_number,
                date = ?raw_match.date,
                "Unparseable kickoff, leaving date fields null"
            );
        }

        let record = clean_record(raw_match, kickoff);
        if seen.contains(&record) {
            stats.duplicates_removed += 1;
            debug!(match_number = record.match_number, "Dropping duplicate row");
            continue;
        }

        if !keys.insert(record.match_number) && conflicting.insert(record.match_number) {
            warn!(
                match_number = record.match_number,
                "Match number appears on differing rows; the last one wins on load"
            );
        }

        seen.insert(record.clone());
        rows.push(record);
    }

    stats.conflicting_keys = conflicting.into_iter().collect();
    info!(
        clean_rows = rows.len(),
        duplicates = stats.duplicates_removed,
        unparsed_dates = stats.unparsed_dates,
        "🔧 Transformed matches"
    );

    CleanTable { rows, stats }
}

/// Parse a `DD/MM/YYYY HH:MM` kickoff.
pub fn parse_kickoff(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), KICKOFF_FORMAT).ok()
}

/// Split a kickoff into (year, month, day, time of day).
pub fn kickoff_parts(kickoff: NaiveDateTime) -> (i32, i32, i32, NaiveTime) {
    (
        kickoff.year(),
        kickoff.month() as i32,
        kickoff.day() as i32,
        kickoff.time(),
    )
}

fn clean_record(raw: RawMatch, kickoff: Option<NaiveDateTime>) -> MatchRecord {
    let parts = kickoff.map(kickoff_parts);
    MatchRecord {
        match_number: raw.match_number,
        round_number: raw.round_number,
        match_year: parts.map(|p| p.0),
        match_month: parts.map(|p| p.1),
        match_day: parts.map(|p| p.2),
        match_time: parts.map(|p| p.3),
        location: clean_text(raw.location),
        home_team: clean_text(raw.home_team),
        away_team: clean_text(raw.away_team),
        group_name: clean_text(raw.group),
        result: clean_text(raw.result),
    }
}

/// Trim, and map blank strings to `None`.
fn clean_text(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(match_number: i32, date: &str, home: &str, away: &str, result: &str) -> RawMatch {
        let text = |s: &str| Some(s.to_string());
        RawMatch {
            match_number,
            round_number: Some(1),
            date: text(date),
            location: text("Prince Moulay Abdellah Stadium"),
            home_team: text(home),
            away_team: text(away),
            group: text("Group A"),
            result: text(result),
        }
    }

    fn table(rows: Vec<RawMatch>) -> RawTable {
        RawTable {
            origin: "test".to_string(),
            headers: Vec::new(),
            rows,
        }
    }

    #[test]
    fn derives_calendar_fields_from_kickoff() {
        let clean = transform_matches(table(vec![raw(
            1,
            "14/06/2025 18:00",
            "Team A",
            "Team B",
            "",
        )]));

        assert_eq!(clean.len(), 1);
        let record = &clean.rows[0];
        assert_eq!(record.match_number, 1);
        assert_eq!(record.match_year, Some(2025));
        assert_eq!(record.match_month, Some(6));
        assert_eq!(record.match_day, Some(14));
        assert_eq!(record.match_time, NaiveTime::from_hms_opt(18, 0, 0));
        assert_eq!(record.home_team.as_deref(), Some("Team A"));
        assert_eq!(record.away_team.as_deref(), Some("Team B"));
        assert_eq!(record.result, None);
        assert_eq!(clean.stats.unparsed_dates, 0);
    }

    #[test]
    fn unparseable_kickoff_nulls_all_derived_fields() {
        let mut missing = raw(3, "", "Egypt", "Zimbabwe", "");
        missing.date = None;
        let clean = transform_matches(table(vec![
            raw(2, "2025-12-22 15:00", "Mali", "Zambia", ""),
            raw(4, "31/02/2025 18:00", "Nigeria", "Tanzania", ""),
            missing,
        ]));

        assert_eq!(clean.len(), 3);
        for record in &clean.rows {
            assert_eq!(record.match_year, None);
            assert_eq!(record.match_month, None);
            assert_eq!(record.match_day, None);
            assert_eq!(record.match_time, None);
        }
        assert_eq!(clean.stats.unparsed_dates, 3);
    }

    #[test]
    fn identical_rows_collapse_to_the_first() {
        let clean = transform_matches(table(vec![
            raw(1, "21/12/2025 20:00", "Morocco", "Comoros", ""),
            raw(2, "22/12/2025 15:00", "Mali", "Zambia", ""),
            raw(1, "21/12/2025 20:00", "Morocco", "Comoros", ""),
            raw(3, "22/12/2025 18:00", "Egypt", "Zimbabwe", ""),
        ]));

        let numbers: Vec<i32> = clean.rows.iter().map(|r| r.match_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(clean.stats.raw_rows, 4);
        assert_eq!(clean.stats.duplicates_removed, 1);
        assert!(clean.stats.conflicting_keys.is_empty());
    }

    #[test]
    fn rows_equal_after_blank_normalization_are_duplicates() {
        let clean = transform_matches(table(vec![
            raw(9, "23/12/2025 21:00", "Senegal", "Botswana", ""),
            raw(9, " 23/12/2025 21:00 ", " Senegal", "Botswana ", "   "),
        ]));
        assert_eq!(clean.len(), 1);
        assert_eq!(clean.stats.duplicates_removed, 1);
    }

    #[test]
    fn differing_rows_with_same_key_are_kept_and_reported() {
        let clean = transform_matches(table(vec![
            raw(5, "24/12/2025 18:00", "Algeria", "Sudan", ""),
            raw(5, "24/12/2025 18:00", "Algeria", "Sudan", "3 - 0"),
        ]));
        assert_eq!(clean.len(), 2);
        assert_eq!(clean.stats.conflicting_keys, vec![5]);
    }

    #[test]
    fn never_grows_the_table() {
        let rows: Vec<RawMatch> = (0..20)
            .map(|i| raw(i % 7, "25/12/2025 20:00", "Home", "Away", ""))
            .collect();
        let clean = transform_matches(table(rows));
        assert!(clean.len() <= 20);
        assert_eq!(clean.len(), 7);
    }

    #[test]
    fn clean_text_trims_and_blanks() {
        assert_eq!(clean_text(Some("  Group C ".to_string())).as_deref(), Some("Group C"));
        assert_eq!(clean_text(Some("\t".to_string())), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn single_digit_day_and_month_parse() {
        let kickoff = parse_kickoff("2/1/2026 17:00").unwrap();
        assert_eq!(
            kickoff_parts(kickoff),
            (2026, 1, 2, NaiveTime::from_hms_opt(17, 0, 0).unwrap())
        );
    }
}
