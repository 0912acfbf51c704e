//! Response validation: repair, shape coercion and relation normalization

use crate::relations::{normalize_relations, synthesize_hierarchy};
use crate::repair::repair;
use kgforge_domain::{AttributeValue, Extraction, SchemaProposal};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static EMBEDDED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("embedded object regex is valid"));

/// What became of one response
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A structurally valid result
    Parsed(Extraction),

    /// Unparsable text, degraded to the empty well-shaped result
    Degraded,

    /// No usable answer (empty response, scalar, or list without an object)
    NoResult,
}

impl ParseOutcome {
    /// Extraction to apply; `None` when the chunk should be skipped
    pub fn extraction(self) -> Option<Extraction> {
        match self {
            ParseOutcome::Parsed(extraction) => Some(extraction),
            ParseOutcome::Degraded => Some(Extraction::empty()),
            ParseOutcome::NoResult => None,
        }
    }

    /// Extraction to apply, empty for degraded and missing results
    pub fn into_extraction(self) -> Extraction {
        self.extraction().unwrap_or_default()
    }

    /// Whether the response yielded a structurally valid result
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Turns raw service output into an [`Extraction`]
///
/// Never fails: every malformed response maps to [`ParseOutcome::Degraded`] or
/// [`ParseOutcome::NoResult`].
///
/// # Examples
///
/// ```
/// use kgforge_extractor::{ParseOutcome, ResponseValidator};
///
/// let validator = ResponseValidator::new();
/// let outcome = validator.validate(Some(r#"{"triples": [["a", "位于", "b"]]}"#));
/// let extraction = outcome.extraction().unwrap();
/// assert_eq!(extraction.triples[0][1], "located_in");
///
/// assert_eq!(validator.validate(None), ParseOutcome::NoResult);
/// assert_eq!(validator.validate(Some("no json here")), ParseOutcome::Degraded);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    synthesize_hierarchy: bool,
}

impl ResponseValidator {
    /// Validator without hierarchy synthesis
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable floor and location-code hierarchy synthesis
    pub fn with_hierarchy_synthesis(mut self, enabled: bool) -> Self {
        self.synthesize_hierarchy = enabled;
        self
    }

    /// Validate one response
    pub fn validate(&self, response: Option<&str>) -> ParseOutcome {
        let Some(raw) = response.filter(|r| !r.trim().is_empty()) else {
            return ParseOutcome::NoResult;
        };

        match repair(raw) {
            Ok(Value::Object(map)) => ParseOutcome::Parsed(self.finish(map)),
            Ok(Value::Array(items)) => {
                warn!("response is a list, using its first object");
                match items.into_iter().find_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                }) {
                    Some(map) => ParseOutcome::Parsed(self.finish(map)),
                    None => {
                        warn!("no object found in list response");
                        ParseOutcome::NoResult
                    }
                }
            }
            Ok(Value::String(text)) => self.from_text(&text),
            Ok(other) => {
                warn!(kind = value_kind(&other), "unexpected response type");
                ParseOutcome::NoResult
            }
            Err(e) => {
                debug!(error = %e, "response is not JSON, searching for an embedded object");
                self.from_text(raw)
            }
        }
    }

    /// Bare text: use an embedded `{...}` span if one repairs to an object
    fn from_text(&self, text: &str) -> ParseOutcome {
        let preview: String = text.chars().take(200).collect();
        warn!(response = %preview, "response is raw text, attempting to extract JSON");

        if let Some(span) = EMBEDDED_OBJECT.find(text) {
            match repair(span.as_str()) {
                Ok(Value::Object(map)) => return ParseOutcome::Parsed(self.finish(map)),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to extract JSON from text"),
            }
        }
        ParseOutcome::Degraded
    }

    fn finish(&self, map: Map<String, Value>) -> Extraction {
        let mut extraction = coerce(map);
        normalize_relations(&mut extraction.triples);
        if self.synthesize_hierarchy {
            synthesize_hierarchy(&mut extraction);
        }
        extraction
    }
}

/// Settle every shape question of a response object once
fn coerce(mut map: Map<String, Value>) -> Extraction {
    let mut extraction = Extraction::empty();

    match map.remove("attributes") {
        Some(Value::Object(attributes)) => {
            for (entity, value) in attributes {
                match value {
                    Value::Null => warn!(entity = %entity, "attributes are null, skipping"),
                    Value::Array(items) => extraction.attributes.push((
                        entity,
                        AttributeValue::List(items.iter().map(text_of).collect()),
                    )),
                    other => {
                        warn!(entity = %entity, "attributes are not a list, converting");
                        extraction
                            .attributes
                            .push((entity, AttributeValue::Scalar(text_of(&other))));
                    }
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => warn!(kind = value_kind(&other), "ignoring malformed attributes"),
    }

    match map.remove("triples") {
        Some(Value::Array(triples)) => {
            for triple in triples {
                match triple {
                    Value::Array(parts) => extraction
                        .triples
                        .push(parts.iter().map(text_of).collect()),
                    other => debug!(kind = value_kind(&other), "skipping non-list triple"),
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => warn!(kind = value_kind(&other), "ignoring malformed triples"),
    }

    if let Some(Value::Object(types)) = map.remove("entity_types") {
        extraction.entity_types = types
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(entity, value)| (entity, text_of(&value)))
            .collect();
    }

    if let Some(Value::Object(proposal)) = map.remove("new_schema_types") {
        let proposal = SchemaProposal {
            nodes: string_list(proposal.get("nodes")),
            relations: string_list(proposal.get("relations")),
            attributes: string_list(proposal.get("attributes")),
        };
        if !proposal.is_empty() {
            extraction.new_schema_types = Some(proposal);
        }
    }

    extraction
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(text_of)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

/// String values as-is, anything else in its JSON form
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
