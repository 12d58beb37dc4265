use once_cell::sync::Lazy;
use regex::Regex;

/// Detects funding announcements in article text using a handful of
/// independent signal patterns. Requires `min_signals` (default 2) to
/// fire before flagging the article, trading recall for precision — a
/// single "raised" or "$Xm" mention is common in retrospectives and
/// roundups, not just fresh announcements.
pub struct FundingDetector {
    min_signals: usize,
}

static ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\braised\b|\bsecured\b|\bclosed\b|\bannounced\s+(?:a|the)\s+\$|\bcompleted\s+(?:a|the)\s+\$").unwrap()
});
static MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\d+(?:\.\d+)?\s*(?:million|billion|M|B)\b|\$\d+(?:\.\d+)?[MB]\b").unwrap()
});
static STAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bseed\s+round\b|\bpre-seed\b|\bSeries\s+[A-F]\b|\bbridge\s+round\b").unwrap()
});
static INVESTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bled\s+by\b|\bco-led\s+by\b|\binvestors?\s+include\b|\bparticipation\s+from\b|\bfrom\s+investors?\b").unwrap()
});
static VALUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bvaluation\b|\bpost-money\b|\bvalued\s+at\b").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

impl FundingDetector {
    pub fn new(min_signals: usize) -> Self {
        Self { min_signals }
    }

    /// Returns `(is_funding, reason)`, where `reason` is a `;`-joined list
    /// of which signals fired (e.g. `action:raised; money:$50M`).
    pub fn detect(&self, text: &str) -> (bool, String) {
        if text.is_empty() {
            return (false, String::new());
        }
        let clean = HTML_TAG.replace_all(&text.to_lowercase(), "");

        let mut signals = Vec::new();
        if let Some(m) = ACTION.find(&clean) {
            signals.push(format!("action:{}", m.as_str()));
        }
        if let Some(m) = MONEY.find(&clean) {
            signals.push(format!("money:{}", m.as_str()));
        }
        if let Some(m) = STAGE.find(&clean) {
            signals.push(format!("stage:{}", m.as_str()));
        }
        if let Some(m) = INVESTOR.find(&clean) {
            signals.push(format!("investor:{}", m.as_str()));
        }
        if let Some(m) = VALUATION.find(&clean) {
            signals.push(format!("valuation:{}", m.as_str()));
        }

        let is_funding = signals.len() >= self.min_signals;
        (is_funding, signals.join("; "))
    }
}

impl Default for FundingDetector {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_signals_trigger_a_funding_hint() {
        let detector = FundingDetector::default();
        let (is_funding, reason) = detector
            .detect("Acme Security raised $50M in a Series B round led by Accel.");
        assert!(is_funding);
        assert!(reason.contains("action:raised"));
        assert!(reason.contains("money:"));
    }

    #[test]
    fn single_signal_is_not_enough() {
        let detector = FundingDetector::default();
        let (is_funding, _) = detector.detect("The company raised concerns about the outage.");
        assert!(!is_funding);
    }

    #[test]
    fn empty_text_is_not_funding() {
        let detector = FundingDetector::default();
        assert_eq!(detector.detect(""), (false, String::new()));
    }
}
