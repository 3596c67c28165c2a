use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::models::{round_half_up, TradeRecord};

pub const DOT_LABELS: [&str; 7] = ["S", "M", "T", "W", "T", "F", "S"];

const FULL_MARKS: f64 = 5.0;
const EARLY_EXIT_PENALTY: f64 = 3.0;
const POINTS_TO_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanControl {
    pub percentage: i64,
    pub trades_outside_plan: usize,
    pub trades_analyzed: usize,
    pub week_start: NaiveDate,
    pub daily_dot_scores: [i64; 7],
}

/// The rule-based score on the 0–5 scale, used when the backend sent none.
pub fn fallback_points(trade: &TradeRecord) -> f64 {
    let mut points = FULL_MARKS;
    if trade.exited_early {
        points -= EARLY_EXIT_PENALTY;
    }
    points.max(0.0)
}

/// Plan adherence for one trade, 0–100.
pub fn trade_score(trade: &TradeRecord) -> f64 {
    match trade.score {
        Some(score) => score.clamp(0.0, 100.0),
        None => fallback_points(trade) * POINTS_TO_PERCENT,
    }
}

/// Plan adherence for one trade on the dot chart's 0–5 scale.
pub fn trade_points(trade: &TradeRecord) -> f64 {
    match trade.score {
        Some(score) => score.clamp(0.0, 100.0) / POINTS_TO_PERCENT,
        None => fallback_points(trade),
    }
}

pub fn adherence_percentage(trades: &[TradeRecord]) -> i64 {
    if trades.is_empty() {
        return 0;
    }
    let total: f64 = trades.iter().map(trade_score).sum();
    round_half_up(total / trades.len() as f64)
}

pub fn trades_outside_plan(trades: &[TradeRecord]) -> usize {
    trades.iter().filter(|trade| trade.exited_early).count()
}

/// One 0–5 score per day of the Sunday-start week beginning `week_start`.
/// Days without trades score 0.
pub fn daily_dot_scores(trades: &[TradeRecord], week_start: NaiveDate) -> [i64; 7] {
    dates::week_days(week_start).map(|day| {
        let points: Vec<f64> = trades
            .iter()
            .filter(|trade| trade.occurred_on() == Some(day))
            .map(trade_points)
            .collect();

        if points.is_empty() {
            0
        } else {
            round_half_up(points.iter().sum::<f64>() / points.len() as f64)
        }
    })
}

pub fn plan_control(trades: &[TradeRecord], today: NaiveDate) -> PlanControl {
    let week_start = dates::sunday_start_of_week(today);
    let summary = PlanControl {
        percentage: adherence_percentage(trades),
        trades_outside_plan: trades_outside_plan(trades),
        trades_analyzed: trades.len(),
        week_start,
        daily_dot_scores: daily_dot_scores(trades, week_start),
    };

    tracing::debug!(
        trades = summary.trades_analyzed,
        percentage = summary.percentage,
        outside_plan = summary.trades_outside_plan,
        "plan control scored"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn trade(occurred_at: Option<NaiveDateTime>, exited_early: bool, score: Option<f64>) -> TradeRecord {
        TradeRecord {
            id: "t".to_string(),
            occurred_at,
            pnl: 0.0,
            exited_early,
            score,
        }
    }

    #[test]
    fn early_exit_fallback_scores_forty() {
        let raw: crate::models::RawTrade =
            serde_json::from_str(r#"{"id": "x", "exitedEarly": "true"}"#).unwrap();
        let record = TradeRecord::from_raw_in(raw, &chrono::Utc).unwrap();
        assert_eq!(trade_score(&record), 40.0);
        assert_eq!(trade_points(&record), 2.0);
    }

    #[test]
    fn clean_trade_without_score_is_full_marks() {
        let clean = trade(None, false, None);
        assert_eq!(trade_score(&clean), 100.0);
        assert_eq!(trade_points(&clean), 5.0);
    }

    #[test]
    fn backend_score_wins_over_fallback() {
        let scored = trade(None, true, Some(85.0));
        assert_eq!(trade_score(&scored), 85.0);
        assert_eq!(trade_points(&scored), 4.25);
    }

    #[test]
    fn percentage_is_mean_over_all_trades() {
        let trades = vec![
            trade(None, false, Some(90.0)),
            trade(None, true, None),
            trade(Some(at(2020, 1, 1, 9)), false, None),
        ];
        // (90 + 40 + 100) / 3 = 76.67
        assert_eq!(adherence_percentage(&trades), 77);
        assert_eq!(trades_outside_plan(&trades), 1);
    }

    #[test]
    fn empty_trade_set_scores_zero() {
        assert_eq!(adherence_percentage(&[]), 0);
        assert_eq!(trades_outside_plan(&[]), 0);
    }

    #[test]
    fn dot_scores_cover_the_sunday_week() {
        // Week of Sunday 2026-10-11.
        let trades = vec![
            trade(Some(at(2026, 10, 11, 10)), false, None),
            trade(Some(at(2026, 10, 13, 9)), true, None),
            trade(Some(at(2026, 10, 13, 15)), false, Some(60.0)),
            trade(Some(at(2026, 10, 17, 23)), false, Some(10.0)),
            trade(Some(at(2026, 10, 18, 1)), false, None),
            trade(None, false, None),
        ];
        let scores = daily_dot_scores(&trades, NaiveDate::from_ymd_opt(2026, 10, 11).unwrap());
        // Tuesday: (2 + 3) / 2 = 2.5 rounds up.
        assert_eq!(scores, [5, 0, 3, 0, 0, 0, 1]);
    }

    #[test]
    fn plan_control_uses_sunday_containing_today() {
        let trades = vec![trade(Some(at(2026, 10, 14, 12)), true, None)];
        let summary = plan_control(&trades, NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
        assert_eq!(summary.week_start, NaiveDate::from_ymd_opt(2026, 10, 11).unwrap());
        assert_eq!(summary.daily_dot_scores, [0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(summary.percentage, 40);
        assert_eq!(summary.trades_outside_plan, 1);
        assert_eq!(summary.trades_analyzed, 1);
    }

    #[test]
    fn dot_scores_never_leave_zero_to_five() {
        let trades = vec![
            trade(Some(at(2026, 10, 12, 9)), false, Some(250.0)),
            trade(Some(at(2026, 10, 14, 9)), false, Some(-40.0)),
        ];
        let scores = daily_dot_scores(&trades, NaiveDate::from_ymd_opt(2026, 10, 11).unwrap());
        assert_eq!(scores[1], 5);
        assert_eq!(scores[3], 0);
    }
}
