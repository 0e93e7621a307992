use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// SQLite connection string for the result store
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Path to the newline-delimited proxy list (host:port per line)
    #[serde(default = "default_proxy_list")]
    pub proxy_list: String,

    /// Base URL of the registry aggregator; the zero-padded KvK number is appended
    #[serde(default = "default_registry_base_url")]
    pub registry_base_url: String,

    /// Per-fetch request timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Proxy rotations attempted per company before giving up on the job
    #[serde(default = "default_max_proxy_rotations")]
    pub max_proxy_rotations: u32,

    /// Consecutive hard failures before a proxy is demoted one health step
    #[serde(default = "default_proxy_fail_threshold")]
    pub proxy_fail_threshold: u32,

    /// Cooldown applied to a proxy after a rate-limit response, in seconds
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: i64,

    /// How long a dead proxy rests before revalidation re-admits it, in seconds
    #[serde(default = "default_dead_retry_cooldown_secs")]
    pub dead_retry_cooldown_secs: i64,
}

fn default_database_url() -> String {
    "sqlite://companies.db?mode=rwc".to_string()
}

fn default_proxy_list() -> String {
    "proxies.txt".to_string()
}

fn default_registry_base_url() -> String {
    "https://opencorporates.com/companies/nl/".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_proxy_rotations() -> u32 {
    3
}

fn default_proxy_fail_threshold() -> u32 {
    3
}

fn default_rate_limit_cooldown_secs() -> i64 {
    300
}

fn default_dead_retry_cooldown_secs() -> i64 {
    1800
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            proxy_list: default_proxy_list(),
            registry_base_url: default_registry_base_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_proxy_rotations: default_max_proxy_rotations(),
            proxy_fail_threshold: default_proxy_fail_threshold(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown_secs(),
            dead_retry_cooldown_secs: default_dead_retry_cooldown_secs(),
        }
    }
}
