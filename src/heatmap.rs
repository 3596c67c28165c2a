use std::collections::HashMap;

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::dates;
use crate::models::{round_half_up, ColorTier, DayEntry};
use crate::windows;

pub const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const SLOT_HOURS: u32 = 3;
pub const SLOT_STARTS: [u32; 8] = [0, 3, 6, 9, 12, 15, 18, 21];

#[derive(Debug, Clone, PartialEq)]
struct Bucket {
    total_score: f64,
    total_trades: u64,
    count: usize,
    start_hour: u32,
    end_hour: Option<u32>,
    messages: Vec<String>,
    colors: Vec<String>,
}

impl Bucket {
    fn new(start_hour: u32, end_hour: Option<u32>) -> Self {
        Self {
            total_score: 0.0,
            total_trades: 0,
            count: 0,
            start_hour,
            end_hour,
            messages: Vec::new(),
            colors: Vec::new(),
        }
    }

    fn view(&self) -> AggregatedWindowView {
        let score = round_half_up(self.total_score / self.count as f64);
        let message = if self.count > 1 {
            format!("Avg. Score: {}% over {} sessions", score, self.count)
        } else {
            self.messages
                .first()
                .cloned()
                .unwrap_or_else(|| "No Data".to_string())
        };

        AggregatedWindowView {
            score,
            trade_count: self.total_trades,
            color: ColorTier::classify(score),
            count: self.count,
            message,
            start_hour: self.start_hour,
            end_hour: self.end_hour,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedWindowView {
    pub score: i64,
    pub trade_count: u64,
    pub color: ColorTier,
    pub count: usize,
    pub message: String,
    pub start_hour: u32,
    pub end_hour: Option<u32>,
}

/// One aggregation pass over a fetched history. Cells are keyed by
/// `(day index, start hour)`; a window starting off the 3-hour grid still
/// gets a bucket but never shows up in [`Heatmap::grid`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Heatmap {
    buckets: HashMap<(usize, u32), Bucket>,
}

impl Heatmap {
    pub fn window(&self, day_index: usize, slot_start: u32) -> Option<AggregatedWindowView> {
        self.buckets
            .get(&(day_index, slot_start))
            .filter(|bucket| bucket.count > 0)
            .map(Bucket::view)
    }

    pub fn color(&self, day_index: usize, slot_start: u32) -> ColorTier {
        ColorTier::for_score(self.window(day_index, slot_start).map(|view| view.score))
    }

    pub fn grid(&self) -> HeatmapGrid {
        let rows = SLOT_STARTS
            .iter()
            .enumerate()
            .map(|(slot, start)| HeatmapRow {
                label: slot_label(slot),
                cells: std::array::from_fn(|day| self.window(day, *start)),
            })
            .collect();
        HeatmapGrid { rows }
    }

    /// True when no grid cell would show data, even if off-grid buckets exist.
    pub fn is_empty(&self) -> bool {
        self.grid().populated_cells() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn messages(&self, day_index: usize, slot_start: u32) -> &[String] {
        self.buckets
            .get(&(day_index, slot_start))
            .map(|bucket| bucket.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn colors(&self, day_index: usize, slot_start: u32) -> &[String] {
        self.buckets
            .get(&(day_index, slot_start))
            .map(|bucket| bucket.colors.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub label: String,
    pub cells: [Option<AggregatedWindowView>; 7],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapGrid {
    pub rows: Vec<HeatmapRow>,
}

impl HeatmapGrid {
    pub fn populated_cells(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| cell.is_some())
            .count()
    }
}

pub fn aggregate(history: &[DayEntry]) -> Heatmap {
    let mut buckets: HashMap<(usize, u32), Bucket> = HashMap::new();

    for entry in history {
        let day = dates::day_index(entry.date);

        for window in windows::resolve_windows(&entry.windows) {
            let bucket = buckets
                .entry((day, window.start_hour))
                .or_insert_with(|| Bucket::new(window.start_hour, window.end_hour));

            bucket.total_score += window.score.unwrap_or(0.0).clamp(0.0, 100.0);
            bucket.total_trades += u64::from(window.trade_count.unwrap_or(0));
            bucket.count += 1;
            if let Some(message) = window.message {
                bucket.messages.push(message);
            }
            if let Some(color) = window.color {
                bucket.colors.push(color);
            }
        }
    }

    tracing::debug!(days = history.len(), buckets = buckets.len(), "heatmap aggregated");
    Heatmap { buckets }
}

/// `"09:00-12:00"`; the last block wraps to `"21:00-00:00"`.
pub fn slot_label(slot: usize) -> String {
    let start = SLOT_STARTS[slot % SLOT_STARTS.len()];
    let end = (start + SLOT_HOURS) % 24;
    format!("{:02}:00-{:02}:00", start, end)
}

/// The `(day index, slot)` cell containing `now`.
pub fn current_cell(now: NaiveDateTime) -> (usize, usize) {
    let slot = (now.hour() / SLOT_HOURS) as usize;
    (dates::day_index(now.date()), slot)
}
