use std::io::Read;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::models::{self, RawTrade, TradeRecord};

#[derive(Deserialize)]
#[serde(untagged)]
enum TradeFeed {
    List(Vec<RawTrade>),
    Wrapped { trades: Vec<RawTrade> },
}

pub fn parse_trades_json(body: &str) -> anyhow::Result<Vec<RawTrade>> {
    let feed: TradeFeed = serde_json::from_str(body).context("trade feed is not valid JSON")?;
    Ok(match feed {
        TradeFeed::List(trades) => trades,
        TradeFeed::Wrapped { trades } => trades,
    })
}

pub fn parse_trades_csv<R: Read>(reader: R) -> anyhow::Result<Vec<RawTrade>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut trades = Vec::new();
    for (line, result) in reader.deserialize::<RawTrade>().enumerate() {
        trades.push(result.with_context(|| format!("invalid trade row {}", line + 1))?);
    }
    Ok(trades)
}

/// Loads a trade snapshot from `.csv` or `.json`, converting timestamps to
/// local time.
pub fn read_trades(path: &Path) -> anyhow::Result<Vec<TradeRecord>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let raws = if is_csv {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        parse_trades_csv(file)?
    } else {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_trades_json(&body)?
    };

    let trades = models::trades_from_raw_in(raws, &chrono::Local)?;
    tracing::info!(trades = trades.len(), path = %path.display(), "trades loaded");
    Ok(trades)
}

pub fn parse_profile(body: &str) -> anyhow::Result<IndexMap<String, f64>> {
    serde_json::from_str(body).context("trait profile must be a JSON object of numbers")
}

pub fn read_profile(path: &Path) -> anyhow::Result<IndexMap<String, f64>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_profile(&body)
}
