use crate::models::{ProfileSnapshot, ProfileVerification};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client};
use std::sync::OnceLock;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; LeadflowProfileCheck/1.0)";

/// LinkedIn answers 999 to non-browser clients for profiles that exist
const LINKEDIN_BOT_WALL: u16 = 999;

/// Result of probing one profile URL
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: ProfileVerification,
    /// Profile fields, when the probe could read them
    pub snapshot: Option<ProfileSnapshot>,
}

impl ProbeOutcome {
    pub fn status_only(status: ProfileVerification) -> Self {
        Self { status, snapshot: None }
    }
}

/// Social-profile existence check
#[async_trait]
pub trait ProfileProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

fn profile_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^https?://(www\.)?linkedin\.com/(in|pub|profile)/[\w-]+/?$")
            .expect("valid profile URL pattern")
    })
}

/// True for a well-formed LinkedIn profile URL
pub fn is_valid_profile_url(url: &str) -> bool {
    profile_url_pattern().is_match(url.trim())
}

/// Map a probe response status to a verification outcome
pub fn classify_status(status: u16) -> ProfileVerification {
    if (200..300).contains(&status) || status == LINKEDIN_BOT_WALL {
        ProfileVerification::Verified
    } else {
        ProfileVerification::Unverified
    }
}

/// HEAD-request probe with an in-memory result cache
pub struct LinkedInProbe {
    client: Client,
    cache: moka::future::Cache<String, ProfileVerification>,
}

impl LinkedInProbe {
    pub fn new(timeout: Duration, cache_size: u64, cache_ttl: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .expect("Failed to create HTTP client");

        let cache = moka::future::CacheBuilder::new(cache_size)
            .time_to_live(cache_ttl)
            .build();

        Self { client, cache }
    }
}

#[async_trait]
impl ProfileProbe for LinkedInProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let url = url.trim();
        if !is_valid_profile_url(url) {
            tracing::debug!(url, "Malformed profile URL");
            return ProbeOutcome::status_only(ProfileVerification::Unverified);
        }

        let key = url.trim_end_matches('/').to_lowercase();
        if let Some(status) = self.cache.get(&key).await {
            return ProbeOutcome::status_only(status);
        }

        let status = match self
            .client
            .head(url)
            .header(header::ACCEPT, "text/html")
            .send()
            .await
        {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(url, error = %e, "Profile probe failed");
                return ProbeOutcome::status_only(ProfileVerification::Unknown);
            }
        };

        self.cache.insert(key, status).await;
        ProbeOutcome::status_only(status)
    }
}
