//! Dataset schema and additive schema evolution

use serde::{Deserialize, Serialize};

/// The allowed vocabulary of a dataset
///
/// Persisted as a JSON object with `Nodes`, `Relations` and `Attributes` arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Node (entity) types
    #[serde(rename = "Nodes", default)]
    pub nodes: Vec<String>,

    /// Relation types
    #[serde(rename = "Relations", default)]
    pub relations: Vec<String>,

    /// Attribute types
    #[serde(rename = "Attributes", default)]
    pub attributes: Vec<String>,
}

/// Schema growth proposed by the extraction service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProposal {
    /// Proposed node types
    #[serde(default)]
    pub nodes: Vec<String>,

    /// Proposed relation types
    #[serde(default)]
    pub relations: Vec<String>,

    /// Proposed attribute types
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl SchemaProposal {
    /// Whether the proposal names anything at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relations.is_empty() && self.attributes.is_empty()
    }
}

impl Schema {
    /// Whether the schema has no entries
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relations.is_empty() && self.attributes.is_empty()
    }

    /// Merge a proposal into a new schema version
    ///
    /// Entries are only appended, never removed or renamed. Returns `None` when the
    /// proposal adds nothing, so callers can skip persisting.
    ///
    /// # Examples
    ///
    /// ```
    /// use kgforge_domain::{Schema, SchemaProposal};
    ///
    /// let schema = Schema { nodes: vec!["person".into()], ..Default::default() };
    /// let proposal = SchemaProposal { nodes: vec!["person".into(), "place".into()], ..Default::default() };
    ///
    /// let evolved = schema.absorb(&proposal).unwrap();
    /// assert_eq!(evolved.nodes, vec!["person", "place"]);
    /// assert!(evolved.absorb(&proposal).is_none());
    /// ```
    pub fn absorb(&self, proposal: &SchemaProposal) -> Option<Schema> {
        let mut next = self.clone();
        let added = append_new(&mut next.nodes, &proposal.nodes)
            + append_new(&mut next.relations, &proposal.relations)
            + append_new(&mut next.attributes, &proposal.attributes);

        if added > 0 {
            Some(next)
        } else {
            None
        }
    }
}

fn append_new(existing: &mut Vec<String>, proposed: &[String]) -> usize {
    let mut added = 0;
    for entry in proposed {
        if !existing.contains(entry) {
            existing.push(entry.clone());
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_absorb_appends_only_new_entries() {
        let schema = Schema {
            nodes: vec!["asset".into()],
            relations: vec!["located_in".into()],
            attributes: vec![],
        };
        let proposal = SchemaProposal {
            nodes: vec!["asset".into(), "floor".into()],
            relations: vec!["located_in".into()],
            attributes: vec!["model".into(), "model".into()],
        };

        let evolved = schema.absorb(&proposal).unwrap();
        assert_eq!(evolved.nodes, vec!["asset", "floor"]);
        assert_eq!(evolved.relations, vec!["located_in"]);
        assert_eq!(evolved.attributes, vec!["model"]);
    }

    #[test]
    fn test_absorb_returns_none_without_changes() {
        let schema = Schema {
            nodes: vec!["asset".into()],
            ..Default::default()
        };
        let proposal = SchemaProposal {
            nodes: vec!["asset".into()],
            ..Default::default()
        };
        assert!(schema.absorb(&proposal).is_none());
        assert!(schema.absorb(&SchemaProposal::default()).is_none());
    }

    #[test]
    fn test_schema_json_keys() {
        let schema: Schema =
            serde_json::from_str(r#"{"Nodes": ["a"], "Relations": ["r"]}"#).unwrap();
        assert_eq!(schema.nodes, vec!["a"]);
        assert_eq!(schema.relations, vec!["r"]);
        assert!(schema.attributes.is_empty());

        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.get("Attributes").is_some());
    }

    #[test]
    fn test_proposal_emptiness() {
        assert!(SchemaProposal::default().is_empty());
        let proposal: SchemaProposal = serde_json::from_str(r#"{"relations": ["x"]}"#).unwrap();
        assert!(!proposal.is_empty());
    }

    proptest! {
        /// Property: absorbing a proposal twice changes nothing the second time
        #[test]
        fn test_absorb_is_append_only(
            existing in proptest::collection::vec("[a-z]{1,4}", 0..6),
            proposed in proptest::collection::vec("[a-z]{1,4}", 0..6),
        ) {
            let schema = Schema { nodes: existing.clone(), ..Default::default() };
            let proposal = SchemaProposal { nodes: proposed, ..Default::default() };

            let evolved = schema.absorb(&proposal).unwrap_or_else(|| schema.clone());
            prop_assert_eq!(&evolved.nodes[..existing.len()], &existing[..]);
            prop_assert!(evolved.absorb(&proposal).is_none());
        }
    }
}
