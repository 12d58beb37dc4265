pub mod extraction;
pub mod lexicon;
pub mod relevance;

use std::sync::Arc;

use chrono::Utc;
use sentineldesk_common::config::ClassifierConfig;
use sentineldesk_common::error::PipelineError;
use sentineldesk_common::ids::sha256_hex16;
use sentineldesk_common::types::{Article, Category, ExtractionResult, Patent, RelevanceResult, SourceType};

use crate::cache::ClassifierCache;
use crate::oracle::OracleClient;

pub const LLM_MODEL_VERSION: &str = "1";

/// Two-tier relevance/extraction classifier. Prefers the oracle when
/// `use_llm` is enabled and a client was constructed; falls back to the
/// deterministic keyword heuristic when the oracle is disabled, absent,
/// or fails and `fallback_enabled` is set. Results are cached by content
/// fingerprint so re-runs over unchanged items skip both paths entirely.
pub struct Classifier {
    config: ClassifierConfig,
    oracle: Option<Arc<OracleClient>>,
    cache: ClassifierCache,
}

impl Classifier {
    pub fn new(config: ClassifierConfig, oracle: Option<Arc<OracleClient>>, cache: ClassifierCache) -> Self {
        Self { config, oracle, cache }
    }

    pub async fn classify_patent_relevance(&self, patent: &Patent) -> Result<RelevanceResult, PipelineError> {
        let text = format!("{} {}", patent.title, patent.abstract_text);
        let fingerprint = format!("relevance:patent:{}", sha256_hex16(&text));

        if let Some(cached) = self.cache.get(&fingerprint) {
            if let Ok(result) = serde_json::from_value::<RelevanceResult>(cached) {
                return Ok(result);
            }
        }

        let result = match self.oracle_relevance_patent(patent).await {
            Some(result) => result,
            None => relevance::classify_patent_heuristic(
                &patent.publication_number,
                &patent.title,
                &patent.abstract_text,
                &patent.cpc_codes,
                self.config.relevance_threshold,
            ),
        };

        self.cache.insert(fingerprint, serde_json::to_value(&result)?);
        Ok(result)
    }

    pub async fn classify_article_relevance(&self, article: &Article) -> Result<RelevanceResult, PipelineError> {
        let text = text_for_analysis(article, self.config.relevance_context_chars);
        let fingerprint = format!("relevance:article:{}", sha256_hex16(&text));

        if let Some(cached) = self.cache.get(&fingerprint) {
            if let Ok(result) = serde_json::from_value::<RelevanceResult>(cached) {
                return Ok(result);
            }
        }

        let result = match self.oracle_relevance_article(article, &text).await {
            Some(result) => result,
            None => relevance::classify_article_heuristic(article.id.as_str(), &text, self.config.relevance_threshold),
        };

        self.cache.insert(fingerprint, serde_json::to_value(&result)?);
        Ok(result)
    }

    pub async fn classify_patent_extraction(
        &self,
        patent: &Patent,
        relevance_category: Category,
    ) -> Result<ExtractionResult, PipelineError> {
        let text = format!("{} {}", patent.title, patent.abstract_text);
        let fingerprint = format!("extraction:patent:{}", sha256_hex16(&text));

        if let Some(cached) = self.cache.get(&fingerprint) {
            if let Ok(result) = serde_json::from_value::<ExtractionResult>(cached) {
                return Ok(result);
            }
        }

        let result = match self.oracle_extraction_patent(patent, relevance_category).await {
            Some(result) => result,
            None => extraction::extract_patent_heuristic(
                &patent.publication_number,
                &patent.title,
                &patent.abstract_text,
                &patent.cpc_codes,
                &patent.assignees,
                relevance_category,
            ),
        };

        self.cache.insert(fingerprint, serde_json::to_value(&result)?);
        Ok(result)
    }

    pub async fn classify_article_extraction(
        &self,
        article: &Article,
        relevance_category: Category,
    ) -> Result<ExtractionResult, PipelineError> {
        let text = text_for_analysis(article, self.config.extraction_context_chars);
        let fingerprint = format!("extraction:article:{}", sha256_hex16(&text));

        if let Some(cached) = self.cache.get(&fingerprint) {
            if let Ok(result) = serde_json::from_value::<ExtractionResult>(cached) {
                return Ok(result);
            }
        }

        let result = match self.oracle_extraction_article(article, &text, relevance_category).await {
            Some(result) => result,
            None => extraction::extract_article_heuristic(
                article.id.as_str(),
                &article.title,
                &article.summary,
                &text,
                relevance_category,
            ),
        };

        self.cache.insert(fingerprint, serde_json::to_value(&result)?);
        Ok(result)
    }

    fn want_llm(&self) -> bool {
        self.config.use_llm && self.oracle.is_some()
    }

    async fn oracle_relevance_patent(&self, patent: &Patent) -> Option<RelevanceResult> {
        if !self.want_llm() {
            return None;
        }
        let oracle = self.oracle.as_ref()?;
        let prompt = format!(
            "Classify whether the following patent describes cybersecurity technology. \
             Respond with JSON: {{\"is_relevant\": bool, \"score\": 0-1, \"category\": string, \"reasons\": [string]}}.\n\
             Title: {}\nAbstract: {}",
            patent.title, patent.abstract_text
        );
        let response = oracle.ask_json(&prompt, false).await.ok()?;
        let text = format!("{} {}", patent.title, patent.abstract_text);
        parse_relevance_response(&response, &patent.publication_number, SourceType::Patent, &oracle_model(oracle), &text)
    }

    async fn oracle_relevance_article(&self, article: &Article, text: &str) -> Option<RelevanceResult> {
        if !self.want_llm() {
            return None;
        }
        let oracle = self.oracle.as_ref()?;
        let prompt = format!(
            "Classify whether the following news article is about cybersecurity. \
             Respond with JSON: {{\"is_relevant\": bool, \"score\": 0-1, \"category\": string, \"reasons\": [string]}}.\n\
             Text: {text}"
        );
        let response = oracle.ask_json(&prompt, false).await.ok()?;
        parse_relevance_response(&response, article.id.as_str(), SourceType::Article, &oracle_model(oracle), text)
    }

    async fn oracle_extraction_patent(&self, patent: &Patent, sector: Category) -> Option<ExtractionResult> {
        if !self.want_llm() {
            return None;
        }
        let oracle = self.oracle.as_ref()?;
        let prompt = format!(
            "Extract structured data from this patent. Respond with JSON: \
             {{\"company_names\": [string], \"novelty_score\": 0-1, \"tech_keywords\": [string], \"rationale\": [string]}}.\n\
             Title: {}\nAbstract: {}\nAssignees: {:?}",
            patent.title, patent.abstract_text, patent.assignees
        );
        let response = oracle.ask_json(&prompt, false).await.ok()?;
        parse_extraction_response(&response, &patent.publication_number, SourceType::Patent, sector, &oracle_model(oracle))
    }

    async fn oracle_extraction_article(
        &self,
        article: &Article,
        text: &str,
        sector: Category,
    ) -> Option<ExtractionResult> {
        if !self.want_llm() {
            return None;
        }
        let oracle = self.oracle.as_ref()?;
        let prompt = format!(
            "Extract structured data from this news article. Respond with JSON: \
             {{\"company_names\": [string], \"novelty_score\": 0-1, \"tech_keywords\": [string], \"rationale\": [string]}}.\n\
             Text: {text}"
        );
        let response = oracle.ask_json(&prompt, false).await.ok()?;
        parse_extraction_response(&response, article.id.as_str(), SourceType::Article, sector, &oracle_model(oracle))
    }
}

fn oracle_model(oracle: &OracleClient) -> String {
    oracle.model().to_string()
}

fn text_for_analysis(article: &Article, max_chars: usize) -> String {
    let combined = format!(
        "{} {} {}",
        article.title,
        article.summary,
        article.content.as_deref().unwrap_or("")
    );
    combined.chars().take(max_chars).collect()
}

fn parse_relevance_response(
    value: &serde_json::Value,
    item_id: &str,
    source_type: SourceType,
    model: &str,
    normalized_context: &str,
) -> Option<RelevanceResult> {
    let is_relevant = value.get("is_relevant")?.as_bool()?;
    let score = value.get("score")?.as_f64()?;
    let category = value
        .get("category")
        .and_then(|v| v.as_str())
        .map(Category::from_fuzzy)
        .unwrap_or(Category::Unknown);
    let reasons = value
        .get("reasons")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    Some(RelevanceResult::new(
        item_id.to_string(),
        source_type,
        model.to_string(),
        LLM_MODEL_VERSION.to_string(),
        Utc::now(),
        is_relevant,
        score,
        category,
        reasons,
        normalized_context,
    ))
}

fn parse_extraction_response(
    value: &serde_json::Value,
    item_id: &str,
    source_type: SourceType,
    sector: Category,
    model: &str,
) -> Option<ExtractionResult> {
    let company_names = value
        .get("company_names")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let novelty_score = value.get("novelty_score").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let tech_keywords = value
        .get("tech_keywords")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let rationale = value
        .get("rationale")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    Some(ExtractionResult::new(
        item_id.to_string(),
        source_type,
        model.to_string(),
        LLM_MODEL_VERSION.to_string(),
        Utc::now(),
        company_names,
        sector,
        novelty_score,
        tech_keywords,
        rationale,
        sha256_hex16(item_id),
    ))
}
