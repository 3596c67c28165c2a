use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::{AnalyticsError, Result};

/// A field value as upstream actually sends it: typed, stringly typed, or
/// occasionally a bare number where a timestamp was expected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Loose {
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Loose::Number(value) => *value,
            Loose::Text(text) if !text.trim().is_empty() => text.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_text(&self) -> String {
        match self {
            Loose::Bool(value) => value.to_string(),
            Loose::Number(value) => value.to_string(),
            Loose::Text(text) => text.clone(),
        }
    }
}

/// `true` and `"true"` are truthy; everything else, including absence, is not.
pub fn to_boolean(value: Option<&Loose>) -> bool {
    match value {
        Some(Loose::Bool(flag)) => *flag,
        Some(Loose::Text(text)) => text == "true",
        _ => false,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    pub id: Option<Loose>,
    #[serde(alias = "entry_time")]
    pub entry_time: Option<Loose>,
    #[serde(alias = "created_at")]
    pub created_at: Option<Loose>,
    #[serde(alias = "open_time")]
    pub open_time: Option<Loose>,
    #[serde(alias = "close_time")]
    pub close_time: Option<Loose>,
    pub date: Option<Loose>,
    pub pnl: Option<Loose>,
    #[serde(alias = "exited_early")]
    pub exited_early: Option<Loose>,
    pub score: Option<Loose>,
}

impl RawTrade {
    fn event_time(&self) -> Option<(&'static str, &Loose)> {
        [
            ("entryTime", self.entry_time.as_ref()),
            ("createdAt", self.created_at.as_ref()),
            ("openTime", self.open_time.as_ref()),
            ("closeTime", self.close_time.as_ref()),
            ("date", self.date.as_ref()),
        ]
        .into_iter()
        .find_map(|(field, value)| value.map(|value| (field, value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub id: String,
    pub occurred_at: Option<NaiveDateTime>,
    pub pnl: f64,
    pub exited_early: bool,
    pub score: Option<f64>,
}

impl TradeRecord {
    pub fn from_raw_in<Tz: TimeZone>(raw: RawTrade, tz: &Tz) -> Result<Self> {
        let id = raw.id.as_ref().map(Loose::as_text).unwrap_or_default();

        let occurred_at = match raw.event_time() {
            None => None,
            Some((field, value)) => Some(parse_event_time(value, tz).map_err(|_| {
                AnalyticsError::InvalidTimestampField {
                    trade: id.clone(),
                    field,
                    value: value.as_text(),
                }
            })?),
        };

        Ok(Self {
            pnl: raw.pnl.as_ref().and_then(Loose::as_number).unwrap_or(0.0),
            exited_early: to_boolean(raw.exited_early.as_ref()),
            score: raw.score.as_ref().and_then(Loose::as_number),
            occurred_at,
            id,
        })
    }

    pub fn occurred_on(&self) -> Option<NaiveDate> {
        self.occurred_at.map(|timestamp| timestamp.date())
    }
}

impl TryFrom<RawTrade> for TradeRecord {
    type Error = AnalyticsError;

    fn try_from(raw: RawTrade) -> Result<Self> {
        Self::from_raw_in(raw, &chrono::Local)
    }
}

pub fn trades_from_raw_in<Tz: TimeZone>(raws: Vec<RawTrade>, tz: &Tz) -> Result<Vec<TradeRecord>> {
    raws.into_iter()
        .map(|raw| TradeRecord::from_raw_in(raw, tz))
        .collect()
}

/// Bare numbers are epoch milliseconds.
fn parse_event_time<Tz: TimeZone>(value: &Loose, tz: &Tz) -> Result<NaiveDateTime> {
    match value {
        Loose::Text(text) => dates::parse_timestamp_in(text, tz),
        Loose::Number(millis) => DateTime::from_timestamp_millis(*millis as i64)
            .map(|utc| utc.with_timezone(tz).naive_local())
            .ok_or_else(|| AnalyticsError::InvalidDate(millis.to_string())),
        Loose::Bool(_) => Err(AnalyticsError::InvalidDate(value.as_text())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WindowFields")]
pub struct TimeWindowRaw {
    pub id: Option<String>,
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
    pub score: Option<f64>,
    pub trade_count: Option<u32>,
    pub color: Option<String>,
    pub message: Option<String>,
}

/// Window fields as sent. A field of the wrong type or range reads as absent
/// instead of failing the window.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowFields {
    id: Option<Loose>,
    #[serde(alias = "start_hour")]
    start_hour: Option<Loose>,
    #[serde(alias = "end_hour")]
    end_hour: Option<Loose>,
    score: Option<Loose>,
    #[serde(alias = "trade_count")]
    trade_count: Option<Loose>,
    color: Option<Loose>,
    message: Option<Loose>,
}

fn whole_number(value: Option<Loose>) -> Option<u32> {
    let number = value.as_ref().and_then(Loose::as_number)?;
    if number < 0.0 || number.fract() != 0.0 || number > u32::MAX as f64 {
        return None;
    }
    Some(number as u32)
}

fn text(value: Option<Loose>) -> Option<String> {
    match value? {
        Loose::Text(text) => Some(text),
        Loose::Number(_) | Loose::Bool(_) => None,
    }
}

impl From<WindowFields> for TimeWindowRaw {
    fn from(fields: WindowFields) -> Self {
        Self {
            score: fields.score.as_ref().and_then(Loose::as_number),
            start_hour: whole_number(fields.start_hour),
            end_hour: whole_number(fields.end_hour),
            trade_count: whole_number(fields.trade_count),
            id: text(fields.id),
            color: text(fields.color),
            message: text(fields.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub windows: Vec<TimeWindowRaw>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTier {
    Grey,
    Red,
    Yellow,
    Green,
}

impl ColorTier {
    pub const GREEN_FLOOR: i64 = 70;
    pub const YELLOW_FLOOR: i64 = 40;

    /// Only measured scores are classified; grey is reserved for missing data.
    pub fn classify(score: i64) -> Self {
        if score >= Self::GREEN_FLOOR {
            ColorTier::Green
        } else if score >= Self::YELLOW_FLOOR {
            ColorTier::Yellow
        } else {
            ColorTier::Red
        }
    }

    pub fn for_score(score: Option<i64>) -> Self {
        score.map_or(ColorTier::Grey, Self::classify)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorTier::Grey => "None",
            ColorTier::Red => "Low",
            ColorTier::Yellow => "Medium",
            ColorTier::Green => "High",
        }
    }
}

/// Half rounds up, the way the dashboard has always displayed percentages.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
