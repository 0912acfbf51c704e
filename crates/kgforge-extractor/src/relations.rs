//! Relation vocabulary and building hierarchy synthesis

use kgforge_domain::{Extraction, Triple};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::info;

/// Source relation labels and their canonical schema names
const RELATION_TABLE: &[(&str, &str)] = &[
    ("属于", "belongs_to_system"),
    ("位于", "located_in"),
    ("安装位置", "located_in"),
    ("安装在", "located_in"),
    ("生产", "manufactured_by"),
    ("制造", "manufactured_by"),
    ("生产公司", "manufactured_by"),
    ("制造商", "manufactured_by"),
    ("型号", "has_model"),
    ("模型", "has_model"),
    ("服务", "serves"),
    ("连接", "connects_to"),
    ("控制", "controls"),
    ("供应", "supplies"),
    ("包含", "contains"),
    ("部分", "part_of"),
    ("组成", "part_of"),
];

const LOCATED_IN: &str = "located_in";
const PART_OF: &str = "part_of";

static LOCATION_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^LOC-([AB])-(\d+)-").expect("location code regex is valid")
});

/// Canonical name for a relation label; unknown labels pass through
///
/// # Examples
///
/// ```
/// use kgforge_extractor::canonical_relation;
///
/// assert_eq!(canonical_relation("位于"), "located_in");
/// assert_eq!(canonical_relation("feeds"), "feeds");
/// ```
pub fn canonical_relation(label: &str) -> &str {
    mapped_relation(label).unwrap_or(label)
}

fn mapped_relation(label: &str) -> Option<&'static str> {
    RELATION_TABLE
        .iter()
        .find(|(source, _)| *source == label)
        .map(|(_, canonical)| *canonical)
}

/// Rewrite the relation of every triple with at least three elements
pub fn normalize_relations(triples: &mut [Vec<String>]) {
    for triple in triples.iter_mut().filter(|t| t.len() >= 3) {
        if let Some(canonical) = mapped_relation(&triple[1]) {
            triple[1] = canonical.to_string();
        }
    }
}

/// Canonical floor name (`3F` → `三层`, `B1` → `地下一层`, `5F` → `5层`)
pub fn normalize_floor_name(floor: &str) -> String {
    let floor = floor.trim().to_uppercase();
    match floor.as_str() {
        "3F" | "3层" | "三层" => "三层".to_string(),
        "2F" | "2层" | "二层" => "二层".to_string(),
        "1F" | "1层" | "一层" => "一层".to_string(),
        "B1" | "B1层" | "地下一层" => "地下一层".to_string(),
        other => other.replace('F', "层"),
    }
}

/// Building floor named by a location code (`LOC-A-03-AHU` → `A栋三层`)
pub fn floor_from_location(location: &str) -> Option<String> {
    let caps = LOCATION_CODE.captures(location)?;
    let building = caps.get(1)?.as_str();
    let digits = caps.get(2)?.as_str();
    let floor = match digits {
        "01" => "一",
        "02" => "二",
        "03" => "三",
        "04" => "四",
        "05" => "五",
        "06" => "六",
        "07" => "七",
        "08" => "八",
        "09" => "九",
        "10" => "十",
        other => other,
    };
    Some(format!("{}栋{}层", building, floor))
}

/// Add the floor relations the service tends to leave out
///
/// - An entity whose attributes carry `floor:` and `building:` gets
///   `entity located_in <building><floor>`.
/// - Every `x located_in LOC-<B>-<NN>-...` edge gets `LOC-... part_of <B>栋<floor>`.
///
/// Nothing is added that already exists as a triple, and an entity is never made
/// to contain itself. Only triples present before synthesis feed the second rule.
/// Returns the number of triples added.
pub fn synthesize_hierarchy(extraction: &mut Extraction) -> usize {
    let mut existing: HashSet<Triple> = extraction.normalized_triples().collect();
    let mut additional: Vec<Triple> = Vec::new();

    for (entity, values) in &extraction.attributes {
        let mut floor = None;
        let mut building = None;
        for value in values.iter() {
            if let Some(rest) = value.strip_prefix("floor:") {
                floor = Some(rest.trim());
            } else if let Some(rest) = value.strip_prefix("building:") {
                building = Some(rest.trim());
            }
        }

        if let (Some(floor), Some(building)) = (floor, building) {
            let floor_name = format!("{}{}", building, normalize_floor_name(floor));
            // A floor entity describing itself would get a located_in self-loop; skip it
            if floor_name == *entity {
                continue;
            }
            let triple = Triple::new(entity.clone(), LOCATED_IN, floor_name);
            if existing.insert(triple.clone()) {
                additional.push(triple);
            }
        }
    }

    let original: Vec<Triple> = extraction.normalized_triples().collect();
    for triple in original.iter().filter(|t| t.relation == LOCATED_IN) {
        if !triple.object.starts_with("LOC-") {
            continue;
        }
        if let Some(floor_name) = floor_from_location(&triple.object) {
            let derived = Triple::new(triple.object.clone(), PART_OF, floor_name);
            if existing.insert(derived.clone()) {
                additional.push(derived);
            }
        }
    }

    let added = additional.len();
    if added > 0 {
        info!(added, "added hierarchical relations");
        extraction.triples.extend(
            additional
                .into_iter()
                .map(|t| vec![t.subject, t.relation, t.object]),
        );
    }
    added
}
