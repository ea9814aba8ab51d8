use serde::Deserialize;

/// Main configuration structure for Echo-Mesh
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub tuning: TuningConfig,
    pub directory: DirectoryConfig,
    pub output: OutputConfig,
}

/// Crawl loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay between outer-loop iterations (milliseconds)
    #[serde(rename = "iteration-delay")]
    pub iteration_delay: u64,

    /// Number of newly explored artists between graph checkpoints
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u32,

    /// Number of newly explored artists between cache eviction cycles
    #[serde(rename = "cache-clear-interval")]
    pub cache_clear_interval: u32,

    /// Maximum number of recently explored seeds kept for re-confirmation sweeps
    #[serde(rename = "recent-seeds-capacity")]
    pub recent_seeds_capacity: usize,

    /// Attempts per remote call before it fails permanently
    #[serde(rename = "max-fetch-retries")]
    pub max_fetch_retries: u32,

    /// Base backoff between attempts (milliseconds), multiplied by the attempt number
    #[serde(rename = "retry-backoff")]
    pub retry_backoff: u64,

    /// What happens to a candidate whose fetches failed permanently
    #[serde(rename = "failed-expansion", default)]
    pub failed_expansion: FailedExpansionPolicy,
}

/// Policy for candidates whose profile or following fetch failed permanently
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailedExpansionPolicy {
    /// The candidate is dropped for this cycle and not re-scheduled
    #[default]
    Drop,

    /// The candidate is re-scheduled at the priority it was popped with
    Reschedule,
}

/// Empirically tuned prioritisation constants
#[derive(Debug, Clone, Deserialize)]
pub struct TuningConfig {
    /// Fraction of its priority a candidate keeps when deferred at admission
    #[serde(rename = "deferral-factor", default = "default_deferral_factor")]
    pub deferral_factor: f64,

    /// Fraction of its priority a candidate keeps when deferred during a sweep
    #[serde(
        rename = "sweep-deferral-factor",
        default = "default_sweep_deferral_factor"
    )]
    pub sweep_deferral_factor: f64,

    /// Fraction of its recorded priority a skip-list entry keeps when re-added
    #[serde(rename = "cascade-factor", default = "default_cascade_factor")]
    pub cascade_factor: f64,

    /// Maximum encounter boosts one favorited artist gets from one enrichment pass
    #[serde(rename = "boost-cap", default = "default_boost_cap")]
    pub boost_cap: u32,

    /// Boost cap used by the resume bootstrap pass
    #[serde(rename = "bootstrap-boost-cap", default = "default_bootstrap_boost_cap")]
    pub bootstrap_boost_cap: u32,
}

fn default_deferral_factor() -> f64 {
    0.02
}

fn default_sweep_deferral_factor() -> f64 {
    0.1
}

fn default_cascade_factor() -> f64 {
    0.2
}

fn default_boost_cap() -> u32 {
    3
}

fn default_bootstrap_boost_cap() -> u32 {
    100
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            deferral_factor: default_deferral_factor(),
            sweep_deferral_factor: default_sweep_deferral_factor(),
            cascade_factor: default_cascade_factor(),
            boost_cap: default_boost_cap(),
            bootstrap_boost_cap: default_bootstrap_boost_cap(),
        }
    }
}

/// Remote directory (platform API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the platform API
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Client identifier sent with every request
    #[serde(rename = "client-id")]
    pub client_id: String,

    /// Page size requested from paginated endpoints
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory where new session graphs are written
    #[serde(rename = "graph-dir")]
    pub graph_dir: String,
}
