//! Command implementations.

pub mod build;
pub mod chunk;
pub mod schema;

pub use self::build::execute_build;
pub use self::chunk::execute_chunk;
pub use self::schema::execute_schema;

use crate::error::Result;
use kgforge_builder::{BuildConfig, GraphBuilder};
use kgforge_llm::OpenAiCompatibleProvider;

/// Builder backed by the configured chat-completions endpoint.
///
/// The provider wraps a blocking HTTP client, so this must be called (and the
/// builder dropped) outside the async runtime.
pub(crate) fn service_builder(
    config: BuildConfig,
    dataset: &str,
) -> Result<GraphBuilder<OpenAiCompatibleProvider>> {
    let llm = &config.llm;
    let provider = OpenAiCompatibleProvider::new(
        llm.api_base_url.clone(),
        llm.model.clone(),
        llm.temperature,
        llm.timeout_secs,
        llm.api_key(),
    )?;
    Ok(GraphBuilder::new(config, dataset, provider)?)
}
