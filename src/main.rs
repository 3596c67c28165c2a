use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;

use trade_psych_analytics::config::Settings;
use trade_psych_analytics::dates::WeekRange;
use trade_psych_analytics::history::{HeatmapState, HistorySource, JsonFileHistory};
use trade_psych_analytics::models::TradeRecord;
use trade_psych_analytics::{battery, db, heatmap, input, logging, plan, report, traits, trend};

#[derive(Parser)]
#[command(name = "trade-psych-analytics")]
#[command(about = "Behavioral analytics for a trading psychology dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate session windows into the weekly behaviour heatmap
    Heatmap {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Recorded history response (JSON); Postgres is used otherwise
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Score plan adherence and the weekly dot chart
    Plan {
        #[arg(long)]
        trades: Option<PathBuf>,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Build the psychological stability trend for one week
    Trend {
        #[arg(long)]
        trades: Option<PathBuf>,
        #[arg(long)]
        week_of: Option<NaiveDate>,
    },
    /// Order and clamp a trait profile
    Traits {
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        no_trades: bool,
    },
    /// Classify a mental battery reading
    Battery {
        #[arg(long, allow_negative_numbers = true)]
        percentage: f64,
        #[arg(long)]
        level: Option<String>,
    },
    /// Write a markdown report covering every widget
    Report {
        #[arg(long)]
        trades: Option<PathBuf>,
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long)]
        profile: Option<PathBuf>,
        #[arg(long, allow_negative_numbers = true)]
        battery: Option<f64>,
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn heatmap_range(today: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> WeekRange {
    match (start, end) {
        (Some(start), Some(end)) => WeekRange::between(start, end),
        (Some(date), None) | (None, Some(date)) => WeekRange::containing(date),
        (None, None) => WeekRange::current(today),
    }
}

async fn load_trades(settings: &Settings, path: Option<&Path>) -> anyhow::Result<Vec<TradeRecord>> {
    match path {
        Some(path) => input::read_trades(path),
        None => {
            let pool = db::connect(settings).await?;
            db::fetch_trades(&pool).await
        }
    }
}

async fn history_source(settings: &Settings, path: Option<&Path>) -> anyhow::Result<Box<dyn HistorySource>> {
    Ok(match path {
        Some(path) => Box::new(JsonFileHistory::new(path)),
        None => Box::new(db::PgHistory::new(db::connect(settings).await?)),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    logging::init_logging(&settings);

    let today = Local::now().date_naive();

    match cli.command {
        Commands::Heatmap {
            start,
            end,
            history,
        } => {
            let range = heatmap_range(today, start, end);
            let source = history_source(&settings, history.as_deref()).await?;
            let mut state = HeatmapState::default();
            state.refresh(source.as_ref(), range, &Local).await;
            let (day, slot) = heatmap::current_cell(Local::now().naive_local());
            print_json(&serde_json::json!({
                "start": range.start,
                "end": range.end,
                "currentCell": { "day": day, "slot": slot },
                "grid": state.heatmap().grid(),
            }))?;
        }
        Commands::Plan { trades, today: day } => {
            let trades = load_trades(&settings, trades.as_deref()).await?;
            print_json(&plan::plan_control(&trades, day.unwrap_or(today)))?;
        }
        Commands::Trend { trades, week_of } => {
            let trades = load_trades(&settings, trades.as_deref()).await?;
            print_json(&trend::current_week_trend(&trades, week_of.unwrap_or(today)))?;
        }
        Commands::Traits { profile, no_trades } => {
            let profile = input::read_profile(&profile)?;
            print_json(&traits::normalize_traits(&profile, no_trades))?;
        }
        Commands::Battery { percentage, level } => {
            print_json(&battery::mental_battery(percentage, level.as_deref()))?;
        }
        Commands::Report {
            trades,
            history,
            profile,
            battery,
            today: day,
            out,
        } => {
            let today = day.unwrap_or(today);
            let trades = load_trades(&settings, trades.as_deref()).await?;
            let range = WeekRange::current(today);
            let source = history_source(&settings, history.as_deref()).await?;
            let mut state = HeatmapState::default();
            state.refresh(source.as_ref(), range, &Local).await;

            let profile = match profile {
                Some(path) => input::read_profile(&path)?,
                None => IndexMap::new(),
            };

            let map = state.heatmap();
            let plan = plan::plan_control(&trades, today);
            let trend = trend::current_week_trend(&trades, today);
            let traits = traits::normalize_traits(&profile, trades.is_empty());
            let battery = battery.map(|percentage| battery::mental_battery(percentage, None));

            let report = report::build_report(&report::DashboardSnapshot {
                generated_on: today,
                heatmap_range: range,
                heatmap: &map,
                plan: &plan,
                trend: &trend,
                traits: &traits,
                battery: battery.as_ref(),
            });
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
