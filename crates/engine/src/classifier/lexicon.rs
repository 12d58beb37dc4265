use once_cell::sync::Lazy;
use sentineldesk_common::types::Category;
use std::collections::HashMap;

/// CPC code prefixes that map directly to a category when present on a
/// patent, checked longest-prefix-first so `H04L9` (cryptography) wins
/// over the broader `H04L` family.
pub static SECURITY_CPC_PATTERNS: Lazy<Vec<(&'static str, Category)>> = Lazy::new(|| {
    vec![
        ("H04L9", Category::Cryptography),
        ("H04L63", Category::Network),
        ("H04W12", Category::Network),
        ("G06F21", Category::Endpoint),
        ("H04L12/26", Category::Network),
        ("G06F11/30", Category::Vulnerability),
        ("H04K", Category::Cryptography),
        ("G09C", Category::Cryptography),
    ]
});

pub static HIGH_CONFIDENCE_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "malware", "ransomware", "trojan", "botnet", "exploit",
        "vulnerability", "cve-", "zero-day", "zero day",
        "firewall", "intrusion detection", "intrusion prevention",
        "encryption", "decrypt", "cryptograph", "cipher",
        "authentication", "authorization", "iam", "sso", "mfa",
        "endpoint protection", "edr", "xdr", "siem", "soar",
        "penetration test", "red team", "blue team",
        "threat intelligence", "apt", "advanced persistent",
        "ddos", "denial of service", "dos attack",
        "phishing", "spear phishing", "social engineering",
        "data breach", "security breach", "cyber attack",
        "ransomware attack", "malicious code",
    ]
});

pub static MEDIUM_CONFIDENCE_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "security", "cybersecurity", "cyber security",
        "breach", "attack", "threat", "risk",
        "compliance", "gdpr", "hipaa", "pci", "sox",
        "access control", "privilege", "permission",
        "audit", "monitoring", "detection",
        "vulnerability assessment", "security audit",
        "incident response", "forensic",
    ]
});

pub static NEGATIVE_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "marketing", "sales", "hr", "human resources",
        "e-commerce", "retail", "fashion", "food",
        "entertainment", "gaming", "social media",
    ]
});

pub static CATEGORY_KEYWORDS: Lazy<HashMap<Category, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        Category::Cloud,
        vec!["cloud security", "aws security", "azure security", "gcp security", "saas security", "serverless"],
    );
    m.insert(
        Category::Network,
        vec!["firewall", "ids", "ips", "ddos", "vpn", "network security", "perimeter"],
    );
    m.insert(
        Category::Endpoint,
        vec!["edr", "endpoint", "antivirus", "anti-virus", "device security", "mobile security"],
    );
    m.insert(
        Category::Identity,
        vec!["iam", "identity", "authentication", "authorization", "sso", "mfa", "access management"],
    );
    m.insert(
        Category::Vulnerability,
        vec!["vulnerability", "cve", "exploit", "patch", "zero-day", "zero day"],
    );
    m.insert(
        Category::Malware,
        vec!["malware", "ransomware", "trojan", "worm", "virus", "botnet", "c2", "command and control"],
    );
    m.insert(
        Category::Data,
        vec!["encryption", "dlp", "data loss", "privacy", "gdpr", "key management", "data protection"],
    );
    m.insert(
        Category::Governance,
        vec!["compliance", "audit", "policy", "risk", "sox", "hipaa", "pci"],
    );
    m.insert(
        Category::Cryptography,
        vec!["cryptograph", "encryption", "decrypt", "cipher", "pki", "tls", "ssl", "hash"],
    );
    m.insert(
        Category::Application,
        vec!["appsec", "application security", "sast", "dast", "waf", "api security"],
    );
    m
});

pub const PATENT_NOVELTY_HIGH: &[&str] = &[
    "novel", "innovative", "breakthrough", "new method", "new system",
    "first", "unprecedented", "revolutionary", "advanced",
];

pub const PATENT_NOVELTY_MED: &[&str] = &[
    "improved", "enhanced", "optimized", "efficient", "method for",
    "system for", "apparatus for",
];

pub const NEWS_NOVELTY_HIGH: &[&str] = &[
    "launches", "unveils", "introduces", "announces new", "revolutionary",
    "first-of-its-kind", "breakthrough", "innovative platform",
];

pub const NEWS_NOVELTY_MED: &[&str] = &["new product", "new platform", "new feature", "enhanced"];

/// Words that look like company names when captured by `COMPANY_PATTERNS`
/// but are really orgs, standards, or funding-round vocabulary.
pub const COMPANY_EXCLUDE_WORDS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those",
    "cisa", "fbi", "nsa", "cve", "owasp",
    "series", "round", "funding", "million", "billion",
];

/// Detect a category by keyword-hit count, ties broken lexicographically
/// by category name so the result is deterministic independent of
/// hashmap iteration order.
pub fn detect_category(text: &str) -> Category {
    let mut best: Option<(Category, usize)> = None;
    for (category, keywords) in CATEGORY_KEYWORDS.iter() {
        let hits = keywords.iter().filter(|kw| text.contains(*kw)).count();
        if hits == 0 {
            continue;
        }
        best = match best {
            Some((best_cat, best_hits))
                if hits > best_hits
                    || (hits == best_hits && category.as_str() < best_cat.as_str()) =>
            {
                Some((*category, hits))
            }
            Some(existing) => Some(existing),
            None => Some((*category, hits)),
        };
    }
    best.map(|(c, _)| c).unwrap_or(Category::Unknown)
}
