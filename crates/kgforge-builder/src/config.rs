//! Build configuration
//!
//! Loaded from TOML; every section and field has a default, so a file only needs
//! to name what it changes.
//!
//! ```toml
//! [construction]
//! mode = "agent"
//! max_workers = 16
//!
//! [datasets.plant]
//! schema_path = "schemas/plant.json"
//! corpus_path = "data/plant_corpus.json"
//! hierarchy_synthesis = true
//!
//! [output]
//! graphs_dir = "out/graphs"
//! ```

use crate::error::BuildError;
use kgforge_extractor::{PromptStyle, SplitterConfig};
use kgforge_graph::AssemblyMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether the extraction service may grow the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstructionMode {
    /// Ask for `new_schema_types` and evolve the schema mid-build
    #[serde(rename = "agent")]
    Agent,
    /// Fixed schema
    #[default]
    #[serde(rename = "noagent")]
    NoAgent,
}

impl ConstructionMode {
    /// Whether schema evolution is on
    pub fn is_agent(&self) -> bool {
        matches!(self, ConstructionMode::Agent)
    }
}

impl std::str::FromStr for ConstructionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(ConstructionMode::Agent),
            "noagent" => Ok(ConstructionMode::NoAgent),
            other => Err(format!("unknown mode '{}', expected agent or noagent", other)),
        }
    }
}

/// `[construction]`: chunking, scheduling and deadlines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    /// Agent or fixed-schema extraction
    pub mode: ConstructionMode,

    /// Upper bound on concurrent documents
    /// Default: 32 (further capped by available parallelism + 4)
    pub max_workers: usize,

    /// Maximum segment length before length-based re-splitting (characters)
    pub chunk_size: usize,

    /// Characters shared by consecutive length-split windows
    pub overlap: usize,

    /// Chunk count above which smart merging kicks in
    pub max_chunks: usize,

    /// Similarity groups opened during smart merging
    pub merge_target: usize,

    /// Datasets whose documents are kept whole
    pub datasets_no_chunk: Vec<String>,

    /// Per-document deadline in seconds
    /// Default: 180 (3 minutes)
    pub document_timeout_secs: u64,

    /// Deadline for the whole extraction batch in seconds
    /// Default: 300 (5 minutes)
    pub batch_timeout_secs: u64,

    /// Graph write granularity; derived from `mode` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<AssemblyMode>,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            mode: ConstructionMode::NoAgent,
            max_workers: 32,
            chunk_size: 400,
            overlap: 100,
            max_chunks: 30,
            merge_target: 25,
            datasets_no_chunk: Vec::new(),
            document_timeout_secs: 180,
            batch_timeout_secs: 300,
            assembly: None,
        }
    }
}

impl ConstructionConfig {
    /// Assembly mode: explicit setting, else direct for agent builds
    pub fn assembly_mode(&self) -> AssemblyMode {
        self.assembly.unwrap_or(match self.mode {
            ConstructionMode::Agent => AssemblyMode::Direct,
            ConstructionMode::NoAgent => AssemblyMode::Buffered,
        })
    }

    /// Splitter settings derived from this section
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            max_chunks: self.max_chunks,
            merge_target: self.merge_target,
            ..SplitterConfig::default()
        }
    }

    /// Whether `dataset` keeps documents whole
    pub fn is_unchunked(&self, dataset: &str) -> bool {
        self.datasets_no_chunk.iter().any(|d| d == dataset)
    }

    /// Worker pool size: `min(max_workers, available parallelism + 4)`
    pub fn workers(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_workers.min(cpus + 4).max(1)
    }

    /// Per-document deadline
    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.document_timeout_secs)
    }

    /// Batch deadline
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

/// `[datasets.<name>]`: where a dataset lives and how it is prompted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Schema JSON file
    pub schema_path: PathBuf,

    /// Corpus JSON file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<PathBuf>,

    /// Base prompt family
    pub prompt_style: PromptStyle,

    /// Building-asset handling: relation-mapping prompt block and floor synthesis
    pub hierarchy_synthesis: bool,

    /// Whether agent builds may rewrite the schema file
    pub evolvable: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("schemas/default.json"),
            corpus_path: None,
            prompt_style: PromptStyle::General,
            hierarchy_synthesis: false,
            evolvable: false,
        }
    }
}

impl DatasetConfig {
    fn named(schema: &str, style: PromptStyle, evolvable: bool) -> Self {
        Self {
            schema_path: PathBuf::from(format!("schemas/{}.json", schema)),
            prompt_style: style,
            evolvable,
            ..Self::default()
        }
    }
}

/// `[output]`: artifact directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Chunk artifacts, `{chunks_dir}/{dataset}.txt`
    pub chunks_dir: PathBuf,

    /// Graph exports, `{graphs_dir}/{dataset}_new.json`
    pub graphs_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            chunks_dir: PathBuf::from("output/chunks"),
            graphs_dir: PathBuf::from("output/graphs"),
        }
    }
}

impl OutputConfig {
    /// Graph export path for a dataset
    pub fn graph_path(&self, dataset: &str) -> PathBuf {
        self.graphs_dir.join(format!("{}_new.json", dataset))
    }
}

/// `[llm]`: extraction service endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat completions URL
    pub api_base_url: String,

    /// Model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Environment variable holding the API key; unset means no key
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:11434/v1/chat/completions".to_string(),
            model: "qwen2.5:7b".to_string(),
            temperature: 0.3,
            timeout_secs: 60,
            api_key_env: "LLM_API_KEY".to_string(),
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// `[community]`: super-node detection after dedup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Run community detection
    pub enabled: bool,

    /// Structure versus embedding weighting handed to the detector
    pub struct_weight: f32,

    /// Embedding model name handed to embedding-aware detectors
    pub embedding_model: String,

    /// Smallest community kept by the structural detector
    pub min_size: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            struct_weight: 0.3,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            min_size: 2,
        }
    }
}

/// Complete configuration for a build
///
/// # Examples
///
/// ```
/// use kgforge_builder::BuildConfig;
///
/// let config = BuildConfig::default();
/// assert_eq!(config.construction.max_workers, 32);
/// assert!(config.validate().is_ok());
///
/// let fast = BuildConfig::fast();
/// assert!(!fast.community.enabled);
///
/// let thorough = BuildConfig::thorough();
/// assert!(thorough.construction.mode.is_agent());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Chunking, scheduling and deadlines
    pub construction: ConstructionConfig,

    /// Known datasets by name
    pub datasets: BTreeMap<String, DatasetConfig>,

    /// Artifact directories
    pub output: OutputConfig,

    /// Extraction service
    pub llm: LlmConfig,

    /// Community detection
    pub community: CommunityConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let mut datasets = BTreeMap::new();
        for (name, schema, style, evolvable) in [
            ("hotpot", "hotpot", PromptStyle::General, true),
            ("2wiki", "2wiki", PromptStyle::General, true),
            ("musique", "musique", PromptStyle::General, true),
            ("novel", "novels_chs", PromptStyle::Novel, true),
            ("novel_eng", "novels_eng", PromptStyle::NovelEng, false),
            ("graphrag-bench", "graphrag-bench", PromptStyle::General, true),
        ] {
            datasets.insert(name.to_string(), DatasetConfig::named(schema, style, evolvable));
        }
        datasets.insert(
            "building_assets".to_string(),
            DatasetConfig {
                hierarchy_synthesis: true,
                ..DatasetConfig::named("building_assets", PromptStyle::General, false)
            },
        );

        Self {
            construction: ConstructionConfig::default(),
            datasets,
            output: OutputConfig::default(),
            llm: LlmConfig::default(),
            community: CommunityConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Many workers, large chunks, short deadlines, no communities
    ///
    /// For quick iterations on small corpora.
    pub fn fast() -> Self {
        let mut config = Self::default();
        config.construction = ConstructionConfig {
            max_workers: 64,
            chunk_size: 800,
            overlap: 100,
            document_timeout_secs: 60,
            batch_timeout_secs: 120,
            ..ConstructionConfig::default()
        };
        config.community.enabled = false;
        config
    }

    /// Agent mode, small chunks, generous deadlines
    pub fn thorough() -> Self {
        let mut config = Self::default();
        config.construction = ConstructionConfig {
            mode: ConstructionMode::Agent,
            max_workers: 8,
            chunk_size: 300,
            overlap: 60,
            document_timeout_secs: 600,
            batch_timeout_secs: 3600,
            ..ConstructionConfig::default()
        };
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let construction = &self.construction;
        if construction.max_workers == 0 {
            return Err("max_workers must be greater than 0".to_string());
        }
        if construction.document_timeout_secs == 0 || construction.batch_timeout_secs == 0 {
            return Err("timeouts must be greater than 0".to_string());
        }
        construction.splitter_config().validate()?;

        if !(0.0..=1.0).contains(&self.community.struct_weight) {
            return Err("struct_weight must be between 0.0 and 1.0".to_string());
        }
        if self.llm.timeout_secs == 0 {
            return Err("llm timeout_secs must be greater than 0".to_string());
        }
        if let Some((name, _)) = self
            .datasets
            .iter()
            .find(|(_, d)| d.schema_path.as_os_str().is_empty())
        {
            return Err(format!("dataset '{}' has an empty schema_path", name));
        }
        Ok(())
    }

    /// Settings for a dataset
    pub fn dataset(&self, name: &str) -> Result<&DatasetConfig, BuildError> {
        self.datasets
            .get(name)
            .ok_or_else(|| BuildError::UnknownDataset(name.to_string()))
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BuildError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content).map_err(BuildError::Config)?;
        config.validate().map_err(BuildError::Config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert_eq!(config.construction.mode, ConstructionMode::NoAgent);
        assert_eq!(config.construction.chunk_size, 400);
        assert_eq!(config.construction.overlap, 100);
        assert_eq!(config.construction.document_timeout(), Duration::from_secs(180));
        assert_eq!(config.construction.batch_timeout(), Duration::from_secs(300));
        assert_eq!(config.output.chunks_dir, PathBuf::from("output/chunks"));
        assert_eq!(config.community.struct_weight, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(BuildConfig::fast().validate().is_ok());
        assert!(BuildConfig::thorough().validate().is_ok());
        assert!(BuildConfig::fast().construction.chunk_size > BuildConfig::default().construction.chunk_size);
    }

    #[test]
    fn test_default_datasets() {
        let config = BuildConfig::default();
        let novel = config.dataset("novel").unwrap();
        assert_eq!(novel.prompt_style, PromptStyle::Novel);
        assert_eq!(novel.schema_path, PathBuf::from("schemas/novels_chs.json"));
        assert!(novel.evolvable);

        let assets = config.dataset("building_assets").unwrap();
        assert!(assets.hierarchy_synthesis);
        assert!(!assets.evolvable);

        assert!(matches!(
            config.dataset("nope"),
            Err(BuildError::UnknownDataset(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_assembly_follows_mode() {
        let mut construction = ConstructionConfig::default();
        assert_eq!(construction.assembly_mode(), AssemblyMode::Buffered);

        construction.mode = ConstructionMode::Agent;
        assert_eq!(construction.assembly_mode(), AssemblyMode::Direct);

        construction.assembly = Some(AssemblyMode::Buffered);
        assert_eq!(construction.assembly_mode(), AssemblyMode::Buffered);
    }

    #[test]
    fn test_workers_are_capped() {
        let construction = ConstructionConfig {
            max_workers: 10_000,
            ..Default::default()
        };
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(construction.workers(), cpus + 4);

        let construction = ConstructionConfig {
            max_workers: 1,
            ..Default::default()
        };
        assert_eq!(construction.workers(), 1);
    }

    #[test]
    fn test_partial_toml() {
        let config = BuildConfig::from_toml(
            r#"
[construction]
mode = "agent"
datasets_no_chunk = ["hotpot"]

[datasets.plant]
schema_path = "schemas/plant.json"
hierarchy_synthesis = true

[community]
enabled = false
"#,
        )
        .unwrap();

        assert!(config.construction.mode.is_agent());
        assert!(config.construction.is_unchunked("hotpot"));
        assert_eq!(config.construction.max_workers, 32);
        assert!(config.dataset("plant").unwrap().hierarchy_synthesis);
        assert!(!config.community.enabled);
        // An explicit datasets table replaces the built-in list
        assert!(config.dataset("hotpot").is_err());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = BuildConfig::default();
        config.construction.overlap = 400;
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.community.struct_weight = 1.5;
        assert!(config.validate().is_err());

        assert!(BuildConfig::from_toml("[construction]\nmode = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BuildConfig::thorough();
        let parsed = BuildConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kgforge.toml");
        std::fs::write(&path, "[output]\ngraphs_dir = \"graphs\"\n").unwrap();

        let config = BuildConfig::from_file(&path).unwrap();
        assert_eq!(config.output.graph_path("demo"), PathBuf::from("graphs/demo_new.json"));

        std::fs::write(&path, "[construction]\nmax_workers = 0\n").unwrap();
        assert!(matches!(BuildConfig::from_file(&path), Err(BuildError::Config(_))));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("agent".parse::<ConstructionMode>().unwrap(), ConstructionMode::Agent);
        assert!("Agent".parse::<ConstructionMode>().is_err());
    }
}
