use crate::ids::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved entity produced by clustering raw company-name strings.
///
/// `entity_id` is a deterministic function of `canonical_name` alone: two
/// runs that settle on the same canonical name always produce the same id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub entity_id: EntityId,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl ResolvedEntity {
    pub fn new(
        canonical_name: String,
        aliases: Vec<String>,
        sources: Vec<String>,
        confidence: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        let entity_id = EntityId::from_seed(&canonical_name.to_lowercase());
        Self {
            entity_id,
            canonical_name,
            aliases,
            sources,
            confidence: confidence.clamp(0.0, 1.0),
            created_at,
        }
    }
}

/// Mapping `raw_name -> (canonical_name, entity_id, score, rules_applied)`.
///
/// Every raw input produces exactly one `AliasLink` per run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AliasLink {
    pub raw_name: String,
    pub canonical_name: String,
    pub entity_id: EntityId,
    pub score: f64,
    pub rules_applied: Vec<String>,
}

impl AliasLink {
    pub fn new(
        raw_name: String,
        canonical_name: String,
        score: f64,
        rules_applied: Vec<String>,
    ) -> Self {
        let entity_id = EntityId::from_seed(&canonical_name.to_lowercase());
        Self {
            raw_name,
            canonical_name,
            entity_id,
            score,
            rules_applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_matches_alias_link_entity_id() {
        let entity = ResolvedEntity::new(
            "Palo Alto Networks".into(),
            vec!["Palo Alto Networks".into(), "Palo Alto Networks Inc.".into()],
            vec!["patent".into()],
            1.0,
            Utc::now(),
        );
        let alias = AliasLink::new(
            "Palo Alto Networks Inc.".into(),
            "Palo Alto Networks".into(),
            0.95,
            vec!["hard_match".into()],
        );
        assert_eq!(entity.entity_id, alias.entity_id);
    }
}
