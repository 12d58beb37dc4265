use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed category set every relevance/extraction result is projected
/// into. Free-form category strings from the oracle or the heuristic
/// lexicon are mapped onto this set; anything unrecognized collapses to
/// `Unknown` rather than being stored verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cloud,
    Network,
    Endpoint,
    Identity,
    Vulnerability,
    Malware,
    Data,
    Governance,
    Cryptography,
    Application,
    Iot,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Cloud,
        Category::Network,
        Category::Endpoint,
        Category::Identity,
        Category::Vulnerability,
        Category::Malware,
        Category::Data,
        Category::Governance,
        Category::Cryptography,
        Category::Application,
        Category::Iot,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cloud => "cloud",
            Category::Network => "network",
            Category::Endpoint => "endpoint",
            Category::Identity => "identity",
            Category::Vulnerability => "vulnerability",
            Category::Malware => "malware",
            Category::Data => "data",
            Category::Governance => "governance",
            Category::Cryptography => "cryptography",
            Category::Application => "application",
            Category::Iot => "iot",
            Category::Unknown => "unknown",
        }
    }

    /// Projects a free-form string (from the oracle's JSON response, or a
    /// heuristic's arg-max label) into the closed set. Unmapped strings
    /// collapse to `Unknown` rather than erroring, since a bad category
    /// label should never fail an otherwise-valid classification.
    pub fn from_fuzzy(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .unwrap_or(Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_mapping_is_case_insensitive() {
        assert_eq!(Category::from_fuzzy("Cryptography"), Category::Cryptography);
        assert_eq!(Category::from_fuzzy("  malware "), Category::Malware);
    }

    #[test]
    fn unmapped_strings_collapse_to_unknown() {
        assert_eq!(Category::from_fuzzy("quantum-widgets"), Category::Unknown);
    }
}
