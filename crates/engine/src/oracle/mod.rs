mod gemini;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use sentineldesk_common::config::OracleConfig;
use sentineldesk_common::error::OracleError;

/// Substrings that cause a request to be rejected outright unless the
/// caller is explicitly trusted (used for content that already passed
/// through an upstream sanitizer).
const BANNED_PATTERNS: &[&str] = &[
    "<script>",
    "</script>",
    "drop table",
    "delete from",
    "'; --",
    "' or '1'='1",
    "union select",
    "insert into",
];

/// Sliding-window requests-per-minute limiter shared across all callers
/// of a single `OracleClient`.
pub struct OracleLimiter {
    max_rpm: u32,
    timestamps: tokio::sync::Mutex<VecDeque<Instant>>,
}

impl OracleLimiter {
    pub fn new(max_rpm: u32) -> Self {
        Self {
            max_rpm,
            timestamps: tokio::sync::Mutex::new(VecDeque::new()),
        }
    }

    /// Blocks until a slot in the rolling 60-second window is available,
    /// then reserves it.
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.timestamps.lock().await;
                let now = Instant::now();
                while window.front().is_some_and(|ts| now.duration_since(*ts) >= Duration::from_secs(60)) {
                    window.pop_front();
                }

                if window.len() < self.max_rpm as usize {
                    window.push_back(now);
                    None
                } else {
                    let oldest = *window.front().expect("window is full, so non-empty");
                    Some(Duration::from_secs(60).saturating_sub(now.duration_since(oldest)))
                }
            };

            match wait {
                None => return,
                Some(wait) => tokio::time::sleep(wait).await,
            }
        }
    }
}

/// Client for the configured LLM provider ("oracle" — the pipeline's
/// sole LLM dependency, used by the relevance and extraction
/// classifiers). Wraps input validation, a sliding-window rate limiter,
/// and retry-with-backoff around a single provider transport.
pub struct OracleClient {
    http: reqwest::Client,
    config: OracleConfig,
    api_key: String,
    limiter: OracleLimiter,
}

impl OracleClient {
    /// Construct a client for `config`, validating the provider's
    /// credential format eagerly rather than deferring the failure to
    /// the first call.
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            OracleError::BadRequest(format!(
                "{} not set in environment",
                config.api_key_env
            ))
        })?;

        validate_credential_format(&config.provider, &api_key)?;

        Ok(Self {
            http: reqwest::Client::new(),
            limiter: OracleLimiter::new(config.max_rpm),
            config,
            api_key,
        })
    }

    /// Ask the oracle a free-text question, returning its raw text
    /// response.
    pub async fn ask(&self, prompt: &str, trusted: bool) -> Result<String, OracleError> {
        self.validate_input(prompt, trusted)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.limiter.acquire().await;

            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_non_retryable() || attempt >= self.config.max_retries => {
                    metrics::counter!("oracle.errors", "provider" => self.config.provider.clone())
                        .increment(1);
                    return Err(e);
                }
                Err(e) => {
                    let backoff = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(attempt, provider = %self.config.provider, error = %e, "oracle call failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Ask the oracle for a JSON response, stripping markdown code
    /// fences before parsing.
    pub async fn ask_json(&self, prompt: &str, trusted: bool) -> Result<serde_json::Value, OracleError> {
        let text = self.ask(prompt, trusted).await?;
        let cleaned = strip_json_fence(&text);
        serde_json::from_str(cleaned)
            .map_err(|e| OracleError::MalformedResponse(format!("invalid JSON from oracle: {e}")))
    }

    fn validate_input(&self, prompt: &str, trusted: bool) -> Result<(), OracleError> {
        if prompt.chars().count() > self.config.max_prompt_chars {
            return Err(OracleError::BadRequest(format!(
                "prompt too long: {} chars (max {})",
                prompt.chars().count(),
                self.config.max_prompt_chars
            )));
        }

        if !trusted && !self.config.trusted_default {
            let lowered = prompt.to_lowercase();
            for pattern in BANNED_PATTERNS {
                if lowered.contains(pattern) {
                    return Err(OracleError::BadRequest(format!(
                        "suspicious content detected: '{pattern}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// The model label stamped on LLM-tier classification results
    /// (§3: `model == "gemini-flash"` or equivalent).
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_once(&self, prompt: &str) -> Result<String, OracleError> {
        match self.config.provider.as_str() {
            "gemini" => gemini::generate_content(&self.http, &self.api_key, &self.config.model, prompt).await,
            other => Err(OracleError::BadRequest(format!("unknown oracle provider: {other}"))),
        }
    }
}

fn validate_credential_format(provider: &str, api_key: &str) -> Result<(), OracleError> {
    let expected_prefix = match provider {
        "gemini" => Some("AIzaSy"),
        _ => None,
    };

    if let Some(prefix) = expected_prefix {
        if !api_key.starts_with(prefix) {
            return Err(OracleError::BadRequest(format!(
                "invalid API key format for provider '{provider}': expected prefix '{prefix}'"
            )));
        }
    }

    Ok(())
}

fn strip_json_fence(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body_start = start + "```json".len();
        if let Some(end) = text[body_start..].find("```") {
            return text[body_start..body_start + end].trim();
        }
    }
    if let Some(start) = text.find("```") {
        let body_start = start + "```".len();
        if let Some(end) = text[body_start..].find("```") {
            return text[body_start..body_start + end].trim();
        }
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_key_must_start_with_expected_prefix() {
        assert!(validate_credential_format("gemini", "AIzaSyABC123").is_ok());
        assert!(validate_credential_format("gemini", "sk-wrong-prefix").is_err());
    }

    #[test]
    fn unknown_providers_skip_format_validation() {
        assert!(validate_credential_format("custom", "anything").is_ok());
    }

    #[test]
    fn json_fence_stripping_handles_labeled_and_bare_fences() {
        assert_eq!(strip_json_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("{\"a\":1}"), "{\"a\":1}");
    }
}
