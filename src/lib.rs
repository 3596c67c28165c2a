pub mod battery;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod heatmap;
pub mod history;
pub mod input;
pub mod logging;
pub mod models;
pub mod plan;
pub mod report;
pub mod traits;
pub mod trend;
pub mod windows;
