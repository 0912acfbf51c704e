//! Validated extraction results
//!
//! The extraction service answers with loosely shaped JSON. By the time a result
//! reaches this type every shape question has been settled once: attribute values
//! are either a single scalar or a list of strings, and triples are lists of strings
//! whose arity is normalised when they are turned into [`Triple`]s.

use crate::schema::SchemaProposal;
use std::collections::HashMap;

/// Attribute values attached to one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// A single value the service returned without a surrounding list
    Scalar(String),

    /// The expected list form
    List(Vec<String>),
}

impl AttributeValue {
    /// Iterate over the individual attribute strings
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            AttributeValue::Scalar(value) => std::slice::from_ref(value),
            AttributeValue::List(values) => values,
        };
        values.iter().map(String::as_str)
    }

    /// Number of attribute strings
    pub fn len(&self) -> usize {
        match self {
            AttributeValue::Scalar(_) => 1,
            AttributeValue::List(values) => values.len(),
        }
    }

    /// Whether there are no attribute strings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `(subject, relation, object)` fact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    /// Subject entity name
    pub subject: String,

    /// Relation label
    pub relation: String,

    /// Object entity name
    pub object: String,
}

impl Triple {
    /// Create a triple
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Build a triple from a raw element list
    ///
    /// Lists longer than three are truncated to their first three elements;
    /// shorter lists are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use kgforge_domain::Triple;
    ///
    /// let parts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    /// assert_eq!(Triple::from_parts(&parts), Some(Triple::new("a", "b", "c")));
    ///
    /// let short: Vec<String> = vec!["a".into(), "b".into()];
    /// assert_eq!(Triple::from_parts(&short), None);
    /// ```
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        match parts {
            [subject, relation, object, ..] => {
                Some(Self::new(subject.clone(), relation.clone(), object.clone()))
            }
            _ => None,
        }
    }

    /// Tuple view used for membership checks
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.subject, &self.relation, &self.object)
    }
}

/// One chunk's validated extraction result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Entity name to attribute values, in response order
    pub attributes: Vec<(String, AttributeValue)>,

    /// Raw triple element lists, in response order
    pub triples: Vec<Vec<String>>,

    /// Entity name to inferred schema type
    pub entity_types: HashMap<String, String>,

    /// Schema growth proposed by the service (agent mode only)
    pub new_schema_types: Option<SchemaProposal>,
}

impl Extraction {
    /// The empty but well-shaped result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.triples.is_empty() && self.entity_types.is_empty()
    }

    /// Schema type inferred for an entity, if any
    pub fn entity_type(&self, entity: &str) -> Option<&str> {
        self.entity_types.get(entity).map(String::as_str)
    }

    /// Triples with normalised arity, malformed ones dropped
    pub fn normalized_triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.triples.iter().filter_map(|parts| Triple::from_parts(parts))
    }
}
