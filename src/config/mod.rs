use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_detail_url")]
    pub detail_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout. Unset means a hung request blocks its ward.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Stop a ward after this many pages. Unset means paginate until empty.
    #[serde(default)]
    pub max_pages: Option<u32>,
}

/// Ward driver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_wards")]
    pub wards: Vec<u32>,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_true")]
    pub fetch_details: bool,
}

/// Snapshot and export paths
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    #[serde(default = "default_export_path")]
    pub export_path: PathBuf,

    #[serde(default = "default_aggregate_wards")]
    pub aggregate_wards: Vec<u32>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_listing_url() -> String {
    "https://www.stlouis-mo.gov/government/departments/sldc/real-estate/lra-owned-property-search.cfm"
        .to_string()
}
fn default_detail_url() -> String {
    "https://www.stlouis-mo.gov/data/address-search/index.cfm".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_8_4) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/28.0.1500.95 Safari/537.36"
        .to_string()
}
fn default_wards() -> Vec<u32> {
    vec![3]
}
fn default_concurrency() -> usize {
    25
}
fn default_true() -> bool {
    true
}
fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_export_path() -> PathBuf {
    PathBuf::from("stl_properties_by_ward.csv")
}
fn default_aggregate_wards() -> Vec<u32> {
    (1..=27).collect()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            detail_url: default_detail_url(),
            user_agent: default_user_agent(),
            timeout_secs: None,
            max_pages: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wards: default_wards(),
            concurrency: default_concurrency(),
            fetch_details: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            export_path: default_export_path(),
            aggregate_wards: default_aggregate_wards(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("LRA")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("pipeline.wards")
                    .with_list_parse_key("storage.aggregate_wards"),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}
