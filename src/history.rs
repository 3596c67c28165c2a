use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer};

use crate::dates::{self, WeekRange};
use crate::error::Result;
use crate::heatmap::{self, Heatmap};
use crate::models::{DayEntry, TimeWindowRaw};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDayEntry {
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_windows")]
    pub windows: Option<Vec<TimeWindowRaw>>,
}

/// A window that still cannot be read is dropped on its own; its siblings and
/// the rest of the payload survive.
fn lenient_windows<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<TimeWindowRaw>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(values) = Option::<Vec<serde_json::Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let windows = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<TimeWindowRaw>(value) {
            Ok(window) => Some(window),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable window");
                None
            }
        })
        .collect();
    Ok(Some(windows))
}

/// What a history fetch returns: either `{ "history": [...] }` or a single
/// day's `{ "date": ..., "windows": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResult {
    pub history: Option<Vec<RawDayEntry>>,
    #[serde(flatten)]
    pub single: RawDayEntry,
}

impl HistoryResult {
    fn raw_entries(self) -> Vec<RawDayEntry> {
        match self.history {
            Some(history) => history,
            None if self.single.windows.is_some() => vec![self.single],
            None => Vec::new(),
        }
    }

    /// Entries without a date or windows are skipped; a date that is present
    /// but unreadable fails the whole payload.
    pub fn into_entries_in<Tz: TimeZone>(self, tz: &Tz) -> Result<Vec<DayEntry>> {
        let mut entries = Vec::new();
        for raw in self.raw_entries() {
            let (Some(date), Some(windows)) = (raw.date, raw.windows) else {
                continue;
            };
            entries.push(DayEntry {
                date: dates::parse_date_in(&date, tz)?,
                windows,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(&self, start_iso: &str, end_iso: &str) -> anyhow::Result<Option<HistoryResult>>;
}

/// A recorded history response on disk, filtered to the requested range.
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn within_range(raw: &RawDayEntry, start: NaiveDate, end: NaiveDate) -> bool {
    match raw.date.as_deref().map(dates::date_as_written) {
        Some(Ok(date)) => start <= date && date <= end,
        _ => true,
    }
}

#[async_trait]
impl HistorySource for JsonFileHistory {
    async fn fetch_history(&self, start_iso: &str, end_iso: &str) -> anyhow::Result<Option<HistoryResult>> {
        let body = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history file {}", self.path.display()))?;
        let payload: Option<HistoryResult> = serde_json::from_str(&body)
            .with_context(|| format!("malformed history payload in {}", self.path.display()))?;

        let start = dates::date_as_written(start_iso)?;
        let end = dates::date_as_written(end_iso)?;

        Ok(payload.map(|payload| {
            let history = payload
                .raw_entries()
                .into_iter()
                .filter(|raw| within_range(raw, start, end))
                .collect();
            HistoryResult {
                history: Some(history),
                single: RawDayEntry::default(),
            }
        }))
    }
}

/// Fetches the history for `range`. Any failure along the way yields an empty
/// history rather than an error.
pub async fn load_history<S, Tz>(source: &S, range: WeekRange, tz: &Tz) -> Vec<DayEntry>
where
    S: HistorySource + ?Sized,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let (start_iso, end_iso) = match range.iso(tz) {
        Ok(bounds) => bounds,
        Err(err) => {
            tracing::warn!(error = %err, "history range could not be serialized");
            return Vec::new();
        }
    };

    tracing::info!(start = %start_iso, end = %end_iso, "fetching heatmap history");

    let payload = match source.fetch_history(&start_iso, &end_iso).await {
        Ok(Some(payload)) => payload,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(error = %err, "history fetch failed; showing empty heatmap");
            return Vec::new();
        }
    };

    match payload.into_entries_in(tz) {
        Ok(entries) => {
            tracing::info!(days = entries.len(), "history loaded");
            entries
        }
        Err(err) => {
            tracing::warn!(error = %err, "history payload rejected; showing empty heatmap");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub range: WeekRange,
}

/// The heatmap's display state. Only the most recently requested range may
/// replace the shown history; older results are dropped when they land.
#[derive(Debug, Clone, Default)]
pub struct HeatmapState {
    generation: u64,
    range: Option<WeekRange>,
    history: Vec<DayEntry>,
}

impl HeatmapState {
    pub fn request(&mut self, range: WeekRange) -> FetchTicket {
        self.generation += 1;
        self.range = Some(range);
        FetchTicket {
            generation: self.generation,
            range,
        }
    }

    /// Returns `false` when the ticket was superseded and `history` was dropped.
    pub fn apply(&mut self, ticket: FetchTicket, history: Vec<DayEntry>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                latest = self.generation,
                "dropping superseded history result"
            );
            return false;
        }
        self.history = history;
        true
    }

    pub fn range(&self) -> Option<WeekRange> {
        self.range
    }

    pub fn history(&self) -> &[DayEntry] {
        &self.history
    }

    pub fn heatmap(&self) -> Heatmap {
        heatmap::aggregate(&self.history)
    }

    pub async fn refresh<S, Tz>(&mut self, source: &S, range: WeekRange, tz: &Tz) -> bool
    where
        S: HistorySource + ?Sized,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let ticket = self.request(range);
        let history = load_history(source, range, tz).await;
        self.apply(ticket, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    struct CannedHistory {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl HistorySource for CannedHistory {
        async fn fetch_history(&self, _start: &str, _end: &str) -> anyhow::Result<Option<HistoryResult>> {
            match self.body {
                Some(body) => Ok(serde_json::from_str(body)?),
                None => anyhow::bail!("connection reset"),
            }
        }
    }

    fn week() -> WeekRange {
        WeekRange::containing(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap())
    }

    fn parse(body: &str) -> HistoryResult {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn history_array_is_used_directly() {
        let entries = parse(
            r#"{"history": [
                {"date": "2026-10-12", "windows": [{"id": "09-12", "score": 80, "tradeCount": 3}]},
                {"date": "2026-10-13", "windows": []}
            ]}"#,
        )
        .into_entries_in(&Utc)
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(entries[0].windows[0].trade_count, Some(3));
    }

    #[test]
    fn single_windows_object_becomes_one_entry() {
        let entries = parse(r#"{"date": "2026-10-14T08:00:00", "windows": [{"startHour": 6, "endHour": 9}]}"#)
            .into_entries_in(&Utc)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
    }

    #[test]
    fn payload_without_history_or_windows_is_empty() {
        assert!(parse(r#"{"status": "ok"}"#).into_entries_in(&Utc).unwrap().is_empty());
        assert!(parse(r#"{"history": []}"#).into_entries_in(&Utc).unwrap().is_empty());
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let entries = parse(
            r#"{"history": [{"windows": []}, {"date": "2026-10-12"}, {"date": "2026-10-13", "windows": []}]}"#,
        )
        .into_entries_in(&Utc)
        .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unreadable_entry_date_rejects_payload() {
        let result = parse(r#"{"history": [{"date": "someday", "windows": []}]}"#).into_entries_in(&Utc);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn one_malformed_window_does_not_sink_the_week() {
        let source = CannedHistory {
            body: Some(
                r#"{"history": [
                    {"date": "2026-10-12", "windows": [{"id": "09-12", "score": 80, "tradeCount": 3}]},
                    {"date": "2026-10-13", "windows": [
                        {"id": "12-15", "score": 55, "tradeCount": -1},
                        {"startHour": "15", "endHour": "18", "score": 30},
                        {"id": ["broken"], "score": 90},
                        "not a window"
                    ]}
                ]}"#,
            ),
        };
        let entries = load_history(&source, week(), &Utc).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].windows.len(), 2);

        let map = heatmap::aggregate(&entries);
        assert_eq!(map.window(0, 9).unwrap().score, 80);
        let tuesday_noon = map.window(1, 12).unwrap();
        assert_eq!(tuesday_noon.score, 55);
        assert_eq!(tuesday_noon.trade_count, 0);
        assert_eq!(map.window(1, 15).unwrap().score, 30);
    }

    #[tokio::test]
    async fn json_file_history_filters_to_the_written_range() {
        let path = std::env::temp_dir().join(format!("trade-psych-history-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"history": [
                {"date": "2026-10-11", "windows": [{"id": "09-12", "score": 10}]},
                {"date": "2026-10-12", "windows": [{"id": "09-12", "score": 80}]},
                {"date": "2026-10-19", "windows": [{"id": "09-12", "score": 20}]}
            ]}"#,
        )
        .unwrap();

        let source = JsonFileHistory::new(&path);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let entries = load_history(&source, week(), &plus_two).await;
        std::fs::remove_file(&path).unwrap();

        let dates: Vec<NaiveDate> = entries.iter().map(|entry| entry.date).collect();
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()]);

        let map = heatmap::aggregate(&entries);
        assert_eq!(map.window(0, 9).unwrap().score, 80);
        assert!(map.window(6, 9).is_none());
    }

    #[tokio::test]
    async fn missing_history_file_degrades_to_empty() {
        let source = JsonFileHistory::new(std::env::temp_dir().join("trade-psych-no-such-history.json"));
        assert!(load_history(&source, week(), &Utc).await.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_empty() {
        let source = CannedHistory { body: None };
        assert!(load_history(&source, week(), &Utc).await.is_empty());
    }

    #[tokio::test]
    async fn null_and_malformed_payloads_degrade_to_empty() {
        let null = CannedHistory { body: Some("null") };
        assert!(load_history(&null, week(), &Utc).await.is_empty());

        let bad_date = CannedHistory {
            body: Some(r#"{"history": [{"date": "soon", "windows": []}]}"#),
        };
        assert!(load_history(&bad_date, week(), &Utc).await.is_empty());
    }

    #[tokio::test]
    async fn refresh_feeds_the_heatmap() {
        let source = CannedHistory {
            body: Some(r#"{"history": [{"date": "2026-10-12", "windows": [{"id": "09-12", "score": 75}]}]}"#),
        };
        let mut state = HeatmapState::default();
        assert!(state.refresh(&source, week(), &Utc).await);
        assert_eq!(state.range(), Some(week()));
        assert_eq!(state.heatmap().window(0, 9).unwrap().score, 75);
    }

    #[test]
    fn superseded_results_are_dropped() {
        let mut state = HeatmapState::default();
        let first = state.request(week());
        let next_week = WeekRange::containing(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
        let second = state.request(next_week);

        let newer = vec![DayEntry {
            date: next_week.start,
            windows: Vec::new(),
        }];
        assert!(state.apply(second, newer.clone()));
        assert!(!state.apply(first, Vec::new()));
        assert_eq!(state.history(), newer.as_slice());
        assert_eq!(state.range(), Some(next_week));
    }

    #[test]
    fn stale_result_cannot_overwrite_even_if_it_arrives_first() {
        let mut state = HeatmapState::default();
        let first = state.request(week());
        let second = state.request(week());
        assert!(!state.apply(
            first,
            vec![DayEntry {
                date: week().start,
                windows: Vec::new(),
            }]
        ));
        assert!(state.history().is_empty());
        assert!(state.apply(second, Vec::new()));
    }
}
