use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::models::{round_half_up, TradeRecord};

pub const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Calm drops by this much per trade taken that day.
const CALM_PENALTY_PER_TRADE: i64 = 8;

/// `None` in every series means no trades that day; zero is a measured value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTrend {
    pub name: &'static str,
    pub date: NaiveDate,
    pub calm: Option<i64>,
    pub focused: Option<i64>,
    pub impulsive: Option<i64>,
    pub emotional: Option<i64>,
}

impl DayTrend {
    pub fn has_data(&self) -> bool {
        self.calm.is_some()
            || self.focused.is_some()
            || self.impulsive.is_some()
            || self.emotional.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    pub week_start: NaiveDate,
    pub days: [DayTrend; 7],
    pub is_empty: bool,
}

fn percent_of(part: usize, total: usize) -> i64 {
    round_half_up(100.0 * part as f64 / total as f64)
}

fn day_trend(name: &'static str, date: NaiveDate, trades: &[&TradeRecord]) -> DayTrend {
    let total = trades.len();
    if total == 0 {
        return DayTrend {
            name,
            date,
            calm: None,
            focused: None,
            impulsive: None,
            emotional: None,
        };
    }

    let wins = trades.iter().filter(|trade| trade.pnl > 0.0).count();
    let losses = total - wins;
    let early_exits = trades.iter().filter(|trade| trade.exited_early).count();
    let volume_penalty = (total as i64).saturating_mul(CALM_PENALTY_PER_TRADE);

    DayTrend {
        name,
        date,
        calm: Some((100 - volume_penalty).max(0)),
        focused: Some(percent_of(wins, total)),
        impulsive: Some(percent_of(early_exits, total).min(100)),
        emotional: Some(percent_of(losses, total)),
    }
}

/// Builds the stability trend for the seven days beginning `week_start`.
pub fn build_trend(trades: &[TradeRecord], week_start: NaiveDate) -> WeeklyTrend {
    let week = dates::week_days(week_start);
    let days: [DayTrend; 7] = std::array::from_fn(|offset| {
        let date = week[offset];
        let on_day: Vec<&TradeRecord> = trades
            .iter()
            .filter(|trade| trade.occurred_on() == Some(date))
            .collect();
        day_trend(DAY_LABELS[offset], date, &on_day)
    });
    let is_empty = days.iter().all(|day| !day.has_data());

    tracing::debug!(%week_start, is_empty, "stability trend built");
    WeeklyTrend {
        week_start,
        days,
        is_empty,
    }
}

/// The trend for the Sunday-start week containing `today`.
pub fn current_week_trend(trades: &[TradeRecord], today: NaiveDate) -> WeeklyTrend {
    build_trend(trades, dates::sunday_start_of_week(today))
}
