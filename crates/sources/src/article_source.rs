use crate::fetch::{extract_html_content, fetch_url};
use crate::feed::parse_feed;
use crate::funding::FundingDetector;
use crate::rate_limit::DomainRateLimiter;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sentineldesk_common::error::{PipelineError, Result};
use sentineldesk_common::types::{Article, ArticleIngestStats};
use std::collections::HashSet;
use std::time::Duration as StdDuration;

/// One RSS/Atom feed to poll, named the way its source is displayed in logs.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub source_name: String,
    pub url: String,
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, lookback_days: i64) -> Result<(Vec<Article>, ArticleIngestStats)>;
}

/// Polls a configured list of RSS/Atom feeds, dedupes across feeds by
/// article id, optionally fetches full HTML content, and runs the
/// funding-announcement heuristic over the combined text.
pub struct RssArticleSource {
    http: reqwest::Client,
    feeds: Vec<FeedConfig>,
    max_per_feed: usize,
    fetch_content: bool,
    funding_detector: FundingDetector,
    rate_limiter: DomainRateLimiter,
    request_timeout: StdDuration,
}

impl RssArticleSource {
    pub fn new(feeds: Vec<FeedConfig>, max_per_feed: usize, fetch_content: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            feeds,
            max_per_feed,
            fetch_content,
            funding_detector: FundingDetector::default(),
            rate_limiter: DomainRateLimiter::new(2.0),
            request_timeout: StdDuration::from_secs(10),
        }
    }

    async fn fetch_and_parse_feed(&self, feed: &FeedConfig, cutoff: chrono::DateTime<Utc>) -> Result<Vec<Article>> {
        let domain = domain_of(&feed.url);
        self.rate_limiter
            .acquire(&domain, StdDuration::from_secs(10))
            .await
            .map_err(PipelineError::Source)?;

        let (body, status, _content_type) = retry_fetch(&self.http, &feed.url, self.request_timeout, 3)
            .await
            .map_err(|e| PipelineError::Source(format!("{}: {e}", feed.source_name)))?;

        if status >= 400 {
            return Err(PipelineError::Source(format!(
                "{} returned HTTP {status}",
                feed.source_name
            )));
        }

        let mut articles = Vec::new();
        let mut seen_links = HashSet::new();

        for entry in parse_feed(&body).into_iter().take(self.max_per_feed) {
            let Some(link) = entry.link else { continue };
            if entry.title.is_empty() || link.is_empty() {
                continue;
            }
            if !seen_links.insert(link.clone()) {
                continue;
            }
            let Some(published_at) = entry.published_at else {
                continue;
            };
            if published_at < cutoff {
                continue;
            }
            articles.push(Article::new(
                feed.source_name.clone(),
                entry.title,
                link,
                published_at,
                entry.summary,
            ));
        }

        Ok(articles)
    }
}

#[async_trait]
impl ArticleSource for RssArticleSource {
    async fn fetch(&self, lookback_days: i64) -> Result<(Vec<Article>, ArticleIngestStats)> {
        let cutoff = Utc::now() - Duration::days(lookback_days);
        let mut stats = ArticleIngestStats::default();
        let mut seen_ids = HashSet::new();
        let mut all = Vec::new();

        for feed in &self.feeds {
            match self.fetch_and_parse_feed(feed, cutoff).await {
                Ok(articles) => {
                    stats.feeds_processed += 1;
                    for article in articles {
                        if seen_ids.insert(article.id.clone()) {
                            all.push(article);
                        }
                    }
                }
                Err(e) => {
                    stats.feeds_failed += 1;
                    tracing::warn!(feed = %feed.source_name, error = %e, "feed fetch failed, continuing with remaining feeds");
                }
            }
        }

        if self.fetch_content {
            for article in &mut all {
                let domain = domain_of(&article.link);
                if self
                    .rate_limiter
                    .acquire(&domain, StdDuration::from_secs(10))
                    .await
                    .is_err()
                {
                    continue;
                }
                if let Ok((body, status, _ct)) =
                    fetch_url(&self.http, &article.link, Some(self.request_timeout)).await
                {
                    if status == 200 {
                        let content = extract_html_content(&body);
                        stats.bytes_processed += content.len() as u64;
                        article.content = Some(content);
                    }
                }
            }
        }

        for article in &mut all {
            let text = format!(
                "{} {} {}",
                article.title,
                article.summary,
                article.content.clone().unwrap_or_default()
            );
            let (is_funding, reason) = self.funding_detector.detect(&text);
            article.funding_hint = is_funding;
            article.funding_reason = if reason.is_empty() { None } else { Some(reason) };
        }

        stats.articles_fetched = all.len();
        Ok((all, stats))
    }
}

/// Retries transport errors up to `max_retries` times with `2^attempt`
/// second backoff, per the article source's retry contract.
async fn retry_fetch(
    http: &reqwest::Client,
    url: &str,
    timeout: StdDuration,
    max_retries: u32,
) -> std::result::Result<(String, u16, Option<String>), crate::fetch::FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_url(http, url, Some(timeout)).await {
            Ok(result) => return Ok(result),
            Err(_) if attempt < max_retries => {
                attempt += 1;
                tokio::time::sleep(StdDuration::from_secs(2u64.pow(attempt))).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn domain_of(url: &str) -> String {
    url.split("//")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_extraction_strips_scheme_and_path() {
        assert_eq!(domain_of("https://example.com/feed.xml"), "example.com");
        assert_eq!(domain_of("http://news.example.org/a/b"), "news.example.org");
    }
}
