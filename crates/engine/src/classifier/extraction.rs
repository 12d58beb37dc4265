use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sentineldesk_common::ids::sha256_hex16;
use sentineldesk_common::types::{Category, ExtractionResult, SourceType};

use super::lexicon::{
    COMPANY_EXCLUDE_WORDS, HIGH_CONFIDENCE_KEYWORDS, MEDIUM_CONFIDENCE_KEYWORDS, NEWS_NOVELTY_HIGH,
    NEWS_NOVELTY_MED, PATENT_NOVELTY_HIGH, PATENT_NOVELTY_MED,
};

pub const HEURISTIC_MODEL: &str = "heuristic-v1";

static LEGAL_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(Inc\.?|Corp\.?|Ltd\.?|LLC|Co\.?|LP|LLP)$").expect("valid regex")
});

static COMPANY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})\s+(?:announced|raised|secured|launched|unveiled|closed)")
            .expect("valid regex"),
        Regex::new(r"(?:led by|co-led by|from|by)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})").expect("valid regex"),
        Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})\s+(?:has|will)").expect("valid regex"),
    ]
});

/// Heuristic extraction for a patent: company names come from the
/// assignee list (legal-suffix-stripped and deduped), sector from the
/// already-computed relevance category, novelty from keyword density.
pub fn extract_patent_heuristic(
    item_id: &str,
    title: &str,
    abstract_text: &str,
    cpc_codes: &[String],
    assignees: &[String],
    relevance_category: Category,
) -> ExtractionResult {
    let text = format!("{title} {abstract_text}").to_lowercase();
    let company_names = normalize_company_names(assignees);
    let novelty_score = patent_novelty(&text, cpc_codes);
    let tech_keywords = extract_tech_keywords(&text);

    let mut rationale = Vec::new();
    if !company_names.is_empty() {
        rationale.push(format!("Assigned to {}", company_names.iter().take(2).cloned().collect::<Vec<_>>().join(", ")));
    }
    if !cpc_codes.is_empty() {
        rationale.push(format!("CPC codes: {}", cpc_codes.iter().take(3).cloned().collect::<Vec<_>>().join(", ")));
    }
    rationale.push(format!("Sector: {relevance_category}"));

    ExtractionResult::new(
        item_id.to_string(),
        SourceType::Patent,
        HEURISTIC_MODEL.to_string(),
        "1".to_string(),
        Utc::now(),
        company_names,
        relevance_category,
        novelty_score,
        tech_keywords,
        rationale,
        sha256_hex16(&text),
    )
}

/// Heuristic extraction for a news article: company names come from
/// regex matches against title+summary, since articles carry no
/// structured assignee field the way patents do.
pub fn extract_article_heuristic(
    item_id: &str,
    title: &str,
    summary: &str,
    text_for_analysis: &str,
    relevance_category: Category,
) -> ExtractionResult {
    let text = text_for_analysis.to_lowercase();
    let company_names = extract_companies_from_news(title, summary);
    let novelty_score = news_novelty(&text);
    let tech_keywords = extract_tech_keywords(&text);

    let mut rationale = Vec::new();
    if !company_names.is_empty() {
        rationale.push(format!("Mentions {}", company_names.iter().take(2).cloned().collect::<Vec<_>>().join(", ")));
    }
    if text.contains("funding") || text.contains("raised") {
        rationale.push("Funding announcement".to_string());
    }
    rationale.push(format!("Sector: {relevance_category}"));

    ExtractionResult::new(
        item_id.to_string(),
        SourceType::Article,
        HEURISTIC_MODEL.to_string(),
        "1".to_string(),
        Utc::now(),
        company_names,
        relevance_category,
        novelty_score,
        tech_keywords,
        rationale,
        sha256_hex16(&text),
    )
}

fn normalize_company_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let clean = LEGAL_SUFFIX_RE.replace(name.trim(), "").trim().to_string();
        if !clean.is_empty() && seen.insert(clean.to_lowercase()) {
            out.push(clean);
        }
    }
    out.truncate(5);
    out
}

fn extract_companies_from_news(title: &str, summary: &str) -> Vec<String> {
    let text = format!("{title} {summary}");
    let mut seen = std::collections::HashSet::new();
    let mut companies = Vec::new();

    for pattern in COMPANY_PATTERNS.iter() {
        for cap in pattern.captures_iter(&text) {
            let Some(m) = cap.get(1) else { continue };
            let clean = m.as_str().trim().to_string();
            let lower = clean.to_lowercase();
            if !COMPANY_EXCLUDE_WORDS.contains(&lower.as_str()) && seen.insert(lower) {
                companies.push(clean);
            }
        }
    }

    companies.truncate(5);
    companies
}

fn patent_novelty(text: &str, cpc_codes: &[String]) -> f64 {
    let high_count = PATENT_NOVELTY_HIGH.iter().filter(|kw| text.contains(*kw)).count();
    let med_count = PATENT_NOVELTY_MED.iter().filter(|kw| text.contains(*kw)).count();

    let mut score = 0.5;
    score += (high_count as f64 * 0.15).min(0.3);
    score += (med_count as f64 * 0.05).min(0.15);
    if cpc_codes.iter().any(|c| c.starts_with("H04L9")) {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

fn news_novelty(text: &str) -> f64 {
    let high_count = NEWS_NOVELTY_HIGH.iter().filter(|kw| text.contains(*kw)).count();
    let med_count = NEWS_NOVELTY_MED.iter().filter(|kw| text.contains(*kw)).count();

    let mut score = 0.3;
    score += (high_count as f64 * 0.2).min(0.4);
    score += (med_count as f64 * 0.1).min(0.2);
    if text.contains("raised") && text.contains("million") && text.contains("series") {
        score -= 0.1;
    }
    score.clamp(0.0, 1.0)
}

fn extract_tech_keywords(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();

    for keyword in HIGH_CONFIDENCE_KEYWORDS.iter().chain(MEDIUM_CONFIDENCE_KEYWORDS.iter()) {
        if text.contains(keyword) && seen.insert(*keyword) {
            keywords.push(keyword.to_string());
            if keywords.len() >= 10 {
                break;
            }
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignee_legal_suffixes_are_stripped_and_deduped() {
        let names = normalize_company_names(&[
            "Acme Corp.".to_string(),
            "Acme Corp".to_string(),
            "Beta LLC".to_string(),
        ]);
        assert_eq!(names, vec!["Acme".to_string(), "Beta".to_string()]);
    }

    #[test]
    fn company_regex_picks_up_funding_announcement_subject() {
        let companies = extract_companies_from_news(
            "Acme Security",
            "Acme Security announced a $50M Series B round",
        );
        assert!(companies.iter().any(|c| c == "Acme Security"));
    }

    #[test]
    fn crypto_cpc_code_boosts_patent_novelty() {
        let with_crypto = patent_novelty("a method for secure key exchange", &["H04L9/08".to_string()]);
        let without = patent_novelty("a method for secure key exchange", &["G06F1/00".to_string()]);
        assert!(with_crypto > without);
    }
}
