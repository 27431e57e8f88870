use crate::models::{EnrichmentRequest, EnrichmentResult, ProviderKind, SearchFilter, SearchPage};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by directory provider adapters
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} rejected the API key: {message}")]
    Auth { provider: ProviderKind, message: String },

    #[error("{provider} denied access: {message}")]
    Permission { provider: ProviderKind, message: String },

    #[error("{provider} rejected the search parameters: {message}")]
    Validation { provider: ProviderKind, message: String },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited { provider: ProviderKind, message: String },

    #[error("{provider} credits exhausted: {message}")]
    CreditsExhausted { provider: ProviderKind, message: String },

    #[error("{provider} returned {status}: {message}")]
    Upstream { provider: ProviderKind, status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Generic status classification shared by the adapters
    pub fn from_status(provider: ProviderKind, status: u16, message: String) -> Self {
        match status {
            400 | 422 => ProviderError::Validation { provider, message },
            401 => ProviderError::Auth { provider, message },
            402 => ProviderError::CreditsExhausted { provider, message },
            403 => ProviderError::Permission { provider, message },
            429 => ProviderError::RateLimited { provider, message },
            _ => ProviderError::Upstream { provider, status, message },
        }
    }

    /// Rate limits, 5xx and transport failures are transient
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::Network(_) => true,
            ProviderError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Directory provider capability
///
/// Adapters translate the canonical [`SearchFilter`] into their own wire
/// format and map results back into canonical candidates. Providers that
/// cannot reveal contacts keep the default `enrich_contact`.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Largest page the provider serves in one call
    fn max_page_size(&self) -> u32;

    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, ProviderError>;

    fn supports_enrichment(&self) -> bool {
        false
    }

    /// Reveal contact fields for one person. `Ok(None)` means no match.
    async fn enrich_contact(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        let _ = request;
        Ok(None)
    }
}

/// Pull a human-readable message out of an error body
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "error_message"] {
            match json.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(serde_json::Value::String(s)) = obj.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error details".to_string()
    } else {
        trimmed.chars().take(300).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let p = ProviderKind::Apollo;
        assert!(matches!(ProviderError::from_status(p, 401, String::new()), ProviderError::Auth { .. }));
        assert!(matches!(ProviderError::from_status(p, 403, String::new()), ProviderError::Permission { .. }));
        assert!(matches!(ProviderError::from_status(p, 422, String::new()), ProviderError::Validation { .. }));
        assert!(matches!(ProviderError::from_status(p, 402, String::new()), ProviderError::CreditsExhausted { .. }));
        assert!(matches!(ProviderError::from_status(p, 503, String::new()), ProviderError::Upstream { status: 503, .. }));
    }

    #[test]
    fn test_retryable_errors() {
        let p = ProviderKind::Pdl;
        assert!(ProviderError::from_status(p, 429, String::new()).is_retryable());
        assert!(ProviderError::from_status(p, 502, String::new()).is_retryable());
        assert!(!ProviderError::from_status(p, 404, String::new()).is_retryable());
        assert!(!ProviderError::from_status(p, 401, String::new()).is_retryable());
        assert!(!ProviderError::InvalidResponse("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"Invalid key"}"#), "Invalid key");
        assert_eq!(error_message(r#"{"error":{"message":"Bad SQL"}}"#), "Bad SQL");
        assert_eq!(error_message("  plain text  "), "plain text");
        assert_eq!(error_message(""), "no error details");
    }
}
