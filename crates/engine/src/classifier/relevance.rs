use chrono::Utc;
use sentineldesk_common::types::{Category, RelevanceResult, SourceType};

use super::lexicon::{
    detect_category, HIGH_CONFIDENCE_KEYWORDS, MEDIUM_CONFIDENCE_KEYWORDS, NEGATIVE_KEYWORDS,
    SECURITY_CPC_PATTERNS,
};

pub const HEURISTIC_MODEL: &str = "heuristic-v1";

/// Heuristic relevance classification for a patent, combining CPC-code
/// mapping with keyword matching over the title+abstract text.
pub fn classify_patent_heuristic(
    item_id: &str,
    title: &str,
    abstract_text: &str,
    cpc_codes: &[String],
    min_score: f64,
) -> RelevanceResult {
    let mut score = 0.0f64;
    let mut reasons = Vec::new();
    let mut category = Category::Unknown;

    'cpc: for cpc in cpc_codes {
        for (pattern, cat) in SECURITY_CPC_PATTERNS.iter() {
            if cpc.starts_with(pattern) {
                score += 0.4;
                reasons.push(format!("Security CPC code: {cpc}"));
                category = *cat;
                break 'cpc;
            }
        }
    }

    let text = format!("{title} {abstract_text}").to_lowercase();

    for keyword in HIGH_CONFIDENCE_KEYWORDS.iter() {
        if text.contains(keyword) {
            score += 0.3;
            reasons.push(format!("High-confidence keyword: {keyword}"));
            if score > 1.0 {
                break;
            }
        }
    }

    for keyword in MEDIUM_CONFIDENCE_KEYWORDS.iter() {
        if text.contains(keyword) {
            score += 0.1;
            reasons.push(format!("Security keyword: {keyword}"));
            if score > 1.0 {
                break;
            }
        }
    }

    if category == Category::Unknown {
        category = detect_category(&text);
    }

    for keyword in NEGATIVE_KEYWORDS.iter() {
        if text.contains(keyword) {
            score -= 0.2;
            break;
        }
    }

    let score = score.clamp(0.0, 1.0);
    let is_relevant = score >= min_score;
    reasons.truncate(4);

    RelevanceResult::new(
        item_id.to_string(),
        SourceType::Patent,
        HEURISTIC_MODEL.to_string(),
        "1".to_string(),
        Utc::now(),
        is_relevant,
        score,
        category,
        reasons,
        &text,
    )
}

/// Heuristic relevance classification for a news article, combining
/// high/medium-confidence keyword counts with a negative-keyword penalty.
pub fn classify_article_heuristic(item_id: &str, text_for_analysis: &str, min_score: f64) -> RelevanceResult {
    let text = text_for_analysis.to_lowercase();
    let mut score = 0.0f64;
    let mut reasons = Vec::new();

    let high_conf_count = HIGH_CONFIDENCE_KEYWORDS
        .iter()
        .filter(|kw| {
            let hit = text.contains(**kw);
            if hit {
                reasons.push(format!("Security keyword: {kw}"));
            }
            hit
        })
        .count();
    if high_conf_count > 0 {
        score += (high_conf_count as f64 * 0.2).min(0.6);
    }

    let med_conf_count = MEDIUM_CONFIDENCE_KEYWORDS.iter().filter(|kw| text.contains(**kw)).count();
    if med_conf_count > 0 {
        score += (med_conf_count as f64 * 0.1).min(0.3);
    }

    let category = detect_category(&text);

    for keyword in NEGATIVE_KEYWORDS.iter() {
        if text.contains(keyword) {
            score -= 0.3;
            reasons.push(format!("Non-security context: {keyword}"));
            break;
        }
    }

    let score = score.clamp(0.0, 1.0);
    let is_relevant = score >= min_score;

    if reasons.is_empty() {
        reasons.push("No strong cybersecurity signals detected".to_string());
    }
    reasons.truncate(4);

    RelevanceResult::new(
        item_id.to_string(),
        SourceType::Article,
        HEURISTIC_MODEL.to_string(),
        "1".to_string(),
        Utc::now(),
        is_relevant,
        score,
        category,
        reasons,
        &text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_cpc_code_drives_category_and_score() {
        let result = classify_patent_heuristic(
            "US-1",
            "Method for key encryption",
            "A novel cipher for secure key exchange",
            &["H04L9/08".to_string()],
            0.5,
        );
        assert_eq!(result.category, Category::Cryptography);
        assert!(result.is_relevant);
    }

    #[test]
    fn marketing_article_scores_low_and_is_not_relevant() {
        let result = classify_article_heuristic(
            "a1",
            "Our new marketing and sales platform for retail e-commerce",
            0.5,
        );
        assert!(!result.is_relevant);
    }

    #[test]
    fn article_with_multiple_high_confidence_keywords_is_relevant() {
        let result = classify_article_heuristic(
            "a2",
            "A ransomware attack exploited a zero-day vulnerability via phishing",
            0.5,
        );
        assert!(result.is_relevant);
        assert!(result.score > 0.5);
    }
}
