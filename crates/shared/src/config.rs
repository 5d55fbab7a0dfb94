use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_SCAPIS_PAGE_DATA_URL: &str =
    "https://www.scapis.org/page-data/publications/page-data.json";
pub const DEFAULT_PUBMED_QUERY: &str =
    "(\"Swedish CArdioPulmonary bioImage Study\" OR SCAPIS[Title/Abstract])";
/// Every Monday at 06:00 UTC (sec min hour day-of-month month day-of-week).
pub const DEFAULT_SCHEDULE: &str = "0 0 6 * * Mon";
pub const USER_AGENT: &str = "SCAPIS-Dashboard/1.0";

#[derive(Debug, Clone)]
pub struct Config {
    pub ncbi_api_key: Option<String>,
    pub pubmed_query: String,
    pub pubmed_base_url: String,
    pub scapis_page_data_url: String,
    pub pubmed_batch_size: usize,
    /// Pause between efetch batches.
    pub batch_delay: Duration,
    pub fetch_retries: u32,
    pub retry_delay: Duration,
    pub schedule: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ncbi_api_key: None,
            pubmed_query: DEFAULT_PUBMED_QUERY.to_string(),
            pubmed_base_url: DEFAULT_PUBMED_BASE_URL.to_string(),
            scapis_page_data_url: DEFAULT_SCAPIS_PAGE_DATA_URL.to_string(),
            pubmed_batch_size: 50,
            batch_delay: Duration::from_millis(500),
            fetch_retries: 3,
            retry_delay: Duration::from_secs(1),
            schedule: DEFAULT_SCHEDULE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from `lookup`, which maps a variable name to its value
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pubmed_base_url = lookup("PUBMED_BASE_URL").unwrap_or(defaults.pubmed_base_url);
        Url::parse(&pubmed_base_url)
            .with_context(|| format!("PUBMED_BASE_URL is not a valid URL: {}", pubmed_base_url))?;

        let scapis_page_data_url =
            lookup("SCAPIS_PAGE_DATA_URL").unwrap_or(defaults.scapis_page_data_url);
        Url::parse(&scapis_page_data_url).with_context(|| {
            format!(
                "SCAPIS_PAGE_DATA_URL is not a valid URL: {}",
                scapis_page_data_url
            )
        })?;

        let pubmed_batch_size =
            Self::parse_var(&lookup, "PUBMED_BATCH_SIZE", defaults.pubmed_batch_size)?;
        if pubmed_batch_size == 0 {
            anyhow::bail!("PUBMED_BATCH_SIZE must be at least 1");
        }

        Ok(Self {
            ncbi_api_key: lookup("NCBI_API_KEY").filter(|k| !k.trim().is_empty()),
            pubmed_query: lookup("PUBMED_QUERY").unwrap_or(defaults.pubmed_query),
            pubmed_base_url,
            scapis_page_data_url,
            pubmed_batch_size,
            batch_delay: defaults.batch_delay,
            fetch_retries: Self::parse_var(&lookup, "FETCH_RETRIES", defaults.fetch_retries)?
                .max(1),
            retry_delay: defaults.retry_delay,
            schedule: lookup("UPDATE_SCHEDULE").unwrap_or(defaults.schedule),
        })
    }

    fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
    where
        F: Fn(&str) -> Option<String>,
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match lookup(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
            None => Ok(default),
        }
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development and CI checkouts)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/scapis-dashboard/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("scapis-dashboard").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }

    pub fn esearch_url(&self) -> String {
        format!("{}/esearch.fcgi", self.pubmed_base_url.trim_end_matches('/'))
    }

    pub fn efetch_url(&self) -> String {
        format!("{}/efetch.fcgi", self.pubmed_base_url.trim_end_matches('/'))
    }
}
