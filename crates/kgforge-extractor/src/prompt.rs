//! Extraction prompt construction

use kgforge_domain::Schema;
use serde::{Deserialize, Serialize};

/// Base instruction family, chosen per dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// General encyclopedic or technical text
    #[default]
    General,
    /// Chinese fiction
    Novel,
    /// English fiction
    NovelEng,
}

impl PromptStyle {
    /// Prompt type name, with the `_agent` suffix in agent mode
    pub fn prompt_type(&self, agent: bool) -> String {
        let base = match self {
            PromptStyle::General => "general",
            PromptStyle::Novel => "novel",
            PromptStyle::NovelEng => "novel_eng",
        };
        if agent {
            format!("{}_agent", base)
        } else {
            base.to_string()
        }
    }

    fn template(&self) -> &'static str {
        match self {
            PromptStyle::General => GENERAL_TEMPLATE,
            PromptStyle::Novel => NOVEL_TEMPLATE,
            PromptStyle::NovelEng => NOVEL_ENG_TEMPLATE,
        }
    }
}

const GENERAL_TEMPLATE: &str = r#"You are an expert at building knowledge graphs from text.

Extract from the text below:
1. "attributes": for each entity, a list of short "key: value" facts about it.
2. "triples": [subject, relation, object] facts between entities.
3. "entity_types": the type of every entity you mention, chosen from the schema when possible.

Prefer the node, relation and attribute types of this schema:
{schema}

Use specific entity names, never generic types, and keep names exactly as written in the text.

Text:
{chunk}"#;

const NOVEL_TEMPLATE: &str = r#"你是一名从小说文本中构建知识图谱的专家。

请从下面的文本中抽取：
1. "attributes"：每个人物、地点或物品的属性列表，格式为 "键: 值"。
2. "triples"：实体之间的 [主语, 关系, 宾语] 三元组。
3. "entity_types"：文本中出现的每个实体的类型，尽量使用模式中的类型。

参考模式：
{schema}

实体名称须与原文一致，不要使用泛指的称呼。

文本：
{chunk}"#;

const NOVEL_ENG_TEMPLATE: &str = r#"You are an expert at building knowledge graphs from fiction.

Extract from the passage below:
1. "attributes": for each character, place or object, a list of short "key: value" facts.
2. "triples": [subject, relation, object] facts between characters, places and objects.
3. "entity_types": the type of every entity you mention, chosen from the schema when possible.

Prefer the types of this schema:
{schema}

Refer to characters by their full names as written in the passage, not by pronouns.

Passage:
{chunk}"#;

const AGENT_ADDENDUM: &str = r#"

If the text needs node, relation or attribute types that the schema lacks, add a fourth field
"new_schema_types": {"nodes": [...], "relations": [...], "attributes": [...]} listing only the
new types. Omit the field when the schema is sufficient."#;

const GENERIC_FORMAT: &str = r#"

CRITICAL FORMAT REQUIREMENTS:
- Return ONLY valid JSON format
- Must include exactly these fields: "attributes", "triples", "entity_types"{agent_field}
- Do not include any explanations or markdown formatting
- Start directly with { and end with }

Example format:
{
  "attributes": {
    "entity_name": ["attribute1", "attribute2"]
  },
  "triples": [
    ["entity1", "relation", "entity2"]
  ],
  "entity_types": {
    "entity_name": "entity_type"
  }
}"#;

const BUILDING_ASSETS_FORMAT: &str = r#"

CRITICAL FORMAT REQUIREMENTS FOR BUILDING ASSETS:
- Return ONLY valid JSON format
- Must include exactly these fields: "attributes", "triples", "entity_types"{agent_field}
- Use ENGLISH relation names from the provided schema
- Use specific entity names (not generic types) as keys in attributes
- Do not include any explanations or markdown formatting
- Start directly with { and end with }

RELATION MAPPING (Use English names):
- "属于" → "belongs_to_system"
- "位于/安装位置/安装在" → "located_in"
- "生产/制造" → "manufactured_by"
- "型号" → "has_model"
- "服务" → "serves"
- "连接" → "connects_to"
- "控制" → "controls"
- "供应" → "supplies"
- "包含" → "contains"
- "部分" → "part_of"

CRITICAL: Extract hierarchical location relationships!
- If equipment is in "LOC-A-03-AHU", create: ["LOC-A-03-AHU", "part_of", "A栋三层"]
- If space has "floor: 3F", create: ["space_name", "located_in", "A栋三层"]
- If equipment has location_id, create both: equipment→located_in→location AND location→part_of→floor
- Always extract floor-level relationships from location codes (LOC-A-03-* means A栋三层)

Building Assets Example:
{
  "attributes": {
    "A栋3层空调箱": ["asset_id: A-AHU-03", "model: KML-20", "install_date: 2022-05-01"],
    "LOC-A-03-AHU": ["location_id: LOC-A-03-AHU", "asset_type: 机房"],
    "A栋三层": ["floor: 3F", "building: A栋"]
  },
  "triples": [
    ["A栋3层空调箱", "located_in", "LOC-A-03-AHU"],
    ["A栋3层空调箱", "belongs_to_system", "HVAC系统"],
    ["LOC-A-03-AHU", "part_of", "A栋三层"],
    ["A栋三层", "located_in", "A栋"]
  ],
  "entity_types": {
    "A栋3层空调箱": "asset",
    "LOC-A-03-AHU": "location",
    "A栋三层": "floor",
    "A栋": "building",
    "HVAC系统": "system"
  }
}"#;

/// Composes extraction prompts for one dataset
///
/// Pure text composition: the schema is passed in on every call, so a schema
/// evolved mid-build shows up in the next prompt.
///
/// # Examples
///
/// ```
/// use kgforge_extractor::{PromptBuilder, PromptStyle};
/// use kgforge_domain::Schema;
///
/// let builder = PromptBuilder::new(PromptStyle::General);
/// let prompt = builder.build(&Schema::default(), "Pump P-1 serves AHU-2.");
/// assert!(prompt.contains("Pump P-1 serves AHU-2."));
/// assert!(prompt.contains("\"entity_types\""));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    style: PromptStyle,
    agent: bool,
    building_assets: bool,
}

impl PromptBuilder {
    /// Builder for a prompt style
    pub fn new(style: PromptStyle) -> Self {
        Self {
            style,
            agent: false,
            building_assets: false,
        }
    }

    /// Ask the service for schema growth proposals
    pub fn agent(mut self, enabled: bool) -> Self {
        self.agent = enabled;
        self
    }

    /// Use the building-asset format block (relation mapping and hierarchy rules)
    pub fn building_assets(mut self, enabled: bool) -> Self {
        self.building_assets = enabled;
        self
    }

    /// Prompt type name (`general`, `novel_agent`, ...)
    pub fn prompt_type(&self) -> String {
        self.style.prompt_type(self.agent)
    }

    /// Compose the prompt for one chunk
    pub fn build(&self, schema: &Schema, chunk: &str) -> String {
        let schema_json = serde_json::to_string(schema).unwrap_or_else(|_| "{}".to_string());

        let mut prompt = self
            .style
            .template()
            .replace("{schema}", &schema_json)
            .replace("{chunk}", chunk);
        if self.agent {
            prompt.push_str(AGENT_ADDENDUM);
        }

        let agent_field = if self.agent {
            ", plus the optional \"new_schema_types\""
        } else {
            ""
        };
        let format = if self.building_assets {
            BUILDING_ASSETS_FORMAT
        } else {
            GENERIC_FORMAT
        };
        prompt.push_str(&format.replace("{agent_field}", agent_field));
        prompt
    }
}
