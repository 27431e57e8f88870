use crate::core::{Ceilings, EnrichmentSettings, FallbackWeights, MatchPolicy, PipelineSettings};
use crate::models::ProviderKind;
use crate::services::retry::{Backoff, RetryPolicy};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub providers: ProvidersSettings,
    pub reasoning: ReasoningSettings,
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub verification: VerificationSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub limits: LimitsSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersSettings {
    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default: ProviderKind,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    pub apollo: ProviderEndpoint,
    pub pdl: ProviderEndpoint,
}

fn default_provider() -> ProviderKind { ProviderKind::Apollo }
fn default_provider_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEndpoint {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl ProviderEndpoint {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
    /// Bound on concurrent qualifications; unset runs every candidate at once
    pub max_concurrency: Option<usize>,
}

fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.3 }
fn default_reasoning_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_backoff")]
    pub backoff: Backoff,
}

fn default_max_retries() -> u32 { 2 }
fn default_retry_delay_ms() -> u64 { 3000 }
fn default_backoff() -> Backoff { Backoff::Fixed }

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_retry_delay_ms(),
            backoff: default_backoff(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.delay_ms),
            backoff: self.backoff,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_cache_size")]
    pub cache_size: u64,
    #[serde(default = "default_probe_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

fn default_true() -> bool { true }
fn default_probe_timeout() -> u64 { 5 }
fn default_probe_cache_size() -> u64 { 10_000 }
fn default_probe_cache_ttl() -> u64 { 86_400 }

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            timeout_secs: default_probe_timeout(),
            cache_size: default_probe_cache_size(),
            cache_ttl_secs: default_probe_cache_ttl(),
            match_policy: MatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub fallback: FallbackWeights,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSettings {
    #[serde(default = "default_max_considered")]
    pub max_considered: usize,
    #[serde(default = "default_max_returned")]
    pub max_returned: usize,
    /// top N when an ICP search does not say
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

fn default_max_considered() -> usize { 1000 }
fn default_max_returned() -> usize { 500 }
fn default_top_n() -> usize { 300 }

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            max_considered: default_max_considered(),
            max_returned: default_max_returned(),
            default_top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with LEADFLOW__)
    /// 4. Well-known variables such as DATABASE_URL and OPENAI_API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LEADFLOW__ENRICHMENT__BATCH_SIZE -> enrichment.batch_size
            .add_source(
                Environment::with_prefix("LEADFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LEADFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Pipeline tunables derived from these settings
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            enrichment: self.enrichment.clone(),
            retry: self.retry.policy(),
            ceilings: Ceilings {
                max_considered: self.limits.max_considered,
                max_returned: self.limits.max_returned,
            },
            fallback: self.scoring.fallback.clone(),
            match_policy: self.verification.match_policy,
            qualification_concurrency: self.reasoning.max_concurrency,
        }
    }
}

/// Overlay well-known environment variables on the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("APOLLO_API_KEY", "providers.apollo.api_key"),
        ("PDL_API_KEY", "providers.pdl.api_key"),
        ("OPENAI_API_KEY", "reasoning.api_key"),
        ("LEADFLOW_PROVIDER", "providers.default"),
        ("LOG_LEVEL", "logging.level"),
        ("LOG_FORMAT", "logging.format"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            if !value.trim().is_empty() {
                builder = builder.set_override(key, value)?;
            }
        }
    }

    builder.build()
}
