use anyhow::Context;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub environment: String,
    pub max_connections: u32,
}

impl Settings {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let max_connections = match std::env::var("PSYCH_DB_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("PSYCH_DB_MAX_CONNECTIONS must be a number, got {value:?}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            max_connections,
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}
