use std::fmt::Write;

use chrono::NaiveDate;

use crate::battery::MentalBattery;
use crate::dates::WeekRange;
use crate::heatmap::{self, Heatmap};
use crate::models::ColorTier;
use crate::plan::{self, PlanControl};
use crate::traits::TraitScore;
use crate::trend::WeeklyTrend;

/// Everything a dashboard refresh derives, computed independently from the
/// same snapshot.
pub struct DashboardSnapshot<'a> {
    pub generated_on: NaiveDate,
    pub heatmap_range: WeekRange,
    pub heatmap: &'a Heatmap,
    pub plan: &'a PlanControl,
    pub trend: &'a WeeklyTrend,
    pub traits: &'a [TraitScore],
    pub battery: Option<&'a MentalBattery>,
}

fn tier_symbol(tier: ColorTier) -> &'static str {
    match tier {
        ColorTier::Grey => ".",
        ColorTier::Red => "L",
        ColorTier::Yellow => "M",
        ColorTier::Green => "H",
    }
}

fn cell(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

pub fn render_heatmap(output: &mut String, map: &Heatmap) {
    let grid = map.grid();
    let _ = writeln!(output, "| Slot | {} |", heatmap::DAY_LABELS.join(" | "));
    let _ = writeln!(output, "|---|{}", "---|".repeat(7));

    for row in grid.rows.iter() {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|view| match view {
                Some(view) => format!("{} {}", tier_symbol(view.color), view.score),
                None => tier_symbol(ColorTier::Grey).to_string(),
            })
            .collect();
        let _ = writeln!(output, "| {} | {} |", row.label, cells.join(" | "));
    }
}

pub fn render_plan(output: &mut String, summary: &PlanControl) {
    let _ = writeln!(
        output,
        "Plan adherence {}% across {} trades ({} outside plan)",
        summary.percentage, summary.trades_analyzed, summary.trades_outside_plan
    );
    let dots: Vec<String> = plan::DOT_LABELS
        .iter()
        .zip(summary.daily_dot_scores.iter())
        .map(|(label, score)| format!("{label}:{score}"))
        .collect();
    let _ = writeln!(output, "Week of {}: {}", summary.week_start, dots.join(" "));
}

pub fn render_trend(output: &mut String, trend: &WeeklyTrend) {
    if trend.is_empty {
        let _ = writeln!(output, "No trend data available for the week of {}.", trend.week_start);
        return;
    }

    let _ = writeln!(output, "| Day | Calm | Focused | Impulsive | Emotional |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for day in trend.days.iter() {
        let _ = writeln!(
            output,
            "| {} {} | {} | {} | {} | {} |",
            day.name,
            day.date,
            cell(day.calm),
            cell(day.focused),
            cell(day.impulsive),
            cell(day.emotional)
        );
    }
}

pub fn render_traits(output: &mut String, traits: &[TraitScore]) {
    for score in traits {
        let _ = writeln!(output, "- {}: {}%", score.name, score.value);
    }
}

pub fn build_report(snapshot: &DashboardSnapshot<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Trading Psychology Report");
    let _ = writeln!(output, "Generated on {}", snapshot.generated_on);

    if let Some(battery) = snapshot.battery {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Mental Battery");
        let _ = writeln!(output, "{}% ({})", battery.percentage, battery.level.label());
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Plan Control");
    render_plan(&mut output, snapshot.plan);

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Behaviour Heatmap ({} to {})",
        snapshot.heatmap_range.start, snapshot.heatmap_range.end
    );
    if snapshot.heatmap.is_empty() {
        let _ = writeln!(output, "No sessions recorded for this range.");
    } else {
        render_heatmap(&mut output, snapshot.heatmap);
        let _ = writeln!(output);
        let legend: Vec<String> = [ColorTier::Grey, ColorTier::Red, ColorTier::Yellow, ColorTier::Green]
            .iter()
            .map(|tier| format!("{} = {}", tier_symbol(*tier), tier.label()))
            .collect();
        let _ = writeln!(output, "Legend: {}", legend.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Psychological Stability Trend");
    render_trend(&mut output, snapshot.trend);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Psychological Traits");
    render_traits(&mut output, snapshot.traits);

    output
}
