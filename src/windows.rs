use crate::models::TimeWindowRaw;

/// A window whose start hour is known. `end_hour` is only absent when the
/// source sent a bare `startHour` with no id to recover the end from.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub start_hour: u32,
    pub end_hour: Option<u32>,
    pub score: Option<f64>,
    pub trade_count: Option<u32>,
    pub color: Option<String>,
    pub message: Option<String>,
}

/// Fills in `startHour`/`endHour` from an `"HH-HH"` id when either is missing.
pub fn normalize_window(raw: TimeWindowRaw) -> TimeWindowRaw {
    if raw.start_hour.is_some() && raw.end_hour.is_some() {
        return raw;
    }

    match raw.id.as_deref().and_then(parse_window_id) {
        Some((start_hour, end_hour)) => TimeWindowRaw {
            start_hour: Some(start_hour),
            end_hour: Some(end_hour),
            ..raw
        },
        None => raw,
    }
}

/// `None` means the window cannot be placed on the grid and is skipped.
pub fn resolve_window(raw: TimeWindowRaw) -> Option<TimeWindow> {
    let raw = normalize_window(raw);
    let start_hour = raw.start_hour.filter(|hour| *hour < 24)?;

    Some(TimeWindow {
        start_hour,
        end_hour: raw.end_hour,
        score: raw.score,
        trade_count: raw.trade_count,
        color: raw.color,
        message: raw.message,
    })
}

pub fn resolve_windows(raws: &[TimeWindowRaw]) -> Vec<TimeWindow> {
    raws.iter().cloned().filter_map(resolve_window).collect()
}

fn parse_window_id(id: &str) -> Option<(u32, u32)> {
    let (start, end) = id.trim().split_once('-')?;
    let start_hour = start.trim().parse::<u32>().ok()?;
    let end_hour = end.trim().parse::<u32>().ok()?;
    (start_hour < 24 && end_hour <= 24).then_some((start_hour, end_hour))
}
