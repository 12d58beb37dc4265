use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// First 16 hex characters of the SHA-256 digest of `input`.
///
/// This is the one identity primitive the whole crate builds on: entity
/// ids, article ids and cache fingerprints are all `sha256_hex16` of some
/// normalized seed string, never a random value, so the same seed always
/// produces the same id across runs.
pub fn sha256_hex16(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..16].to_string()
}

macro_rules! define_hash_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Derives the id deterministically from `seed`.
            pub fn from_seed(seed: &str) -> Self {
                Self(sha256_hex16(seed))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_hash_id!(
    EntityId,
    "Deterministic id of a resolved entity: 16 hex chars of SHA-256 over its lowercased canonical name."
);
define_hash_id!(
    ArticleId,
    "Deterministic id of an article: 16 hex chars of SHA-256 over `source:link`."
);
define_hash_id!(
    Fingerprint,
    "Deterministic id of a classifier cache slot: 16 hex chars of SHA-256 over the normalized context string."
);

/// Correlation id for a single run, threaded through every log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex16_is_deterministic() {
        assert_eq!(sha256_hex16("palo alto networks"), sha256_hex16("palo alto networks"));
        assert_eq!(sha256_hex16("palo alto networks").len(), 16);
    }

    #[test]
    fn entity_id_depends_only_on_seed() {
        let a = EntityId::from_seed("acme corp");
        let b = EntityId::from_seed("acme corp");
        let c = EntityId::from_seed("beta inc");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
