use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    #[error("trade {trade} has an unreadable {field} timestamp: {value:?}")]
    InvalidTimestampField {
        trade: String,
        field: &'static str,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
