//! Build command implementation.

use crate::cli::BuildArgs;
use crate::commands::service_builder;
use crate::error::{CliError, Result};
use kgforge_builder::BuildConfig;
use std::time::Duration;
use tracing::info;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(config: &mut BuildConfig, args: &BuildArgs) -> Result<()> {
    if let Some(mode) = args.mode {
        config.construction.mode = mode.into();
    }
    if let Some(workers) = args.workers {
        config.construction.max_workers = workers;
    }
    if args.no_communities {
        config.community.enabled = false;
    }
    config.validate().map_err(CliError::Config)
}

/// Execute the build command.
pub fn execute_build(args: BuildArgs, mut config: BuildConfig) -> Result<()> {
    apply_overrides(&mut config, &args)?;
    let builder = service_builder(config, &args.dataset)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let output = runtime.block_on(builder.build_from_corpus(args.corpus.as_deref()))?;
    // Documents abandoned at a deadline may still be inside a service call.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    info!(path = %output.graph_file.display(), "graph exported");
    println!("{}", output.metrics.summary());
    println!("Chunks:  {}", output.chunk_file.display());
    println!("Graph:   {} ({} relationships)", output.graph_file.display(), output.records.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModeArg;
    use kgforge_builder::ConstructionMode;

    fn args() -> BuildArgs {
        BuildArgs {
            dataset: "hotpot".to_string(),
            corpus: None,
            mode: None,
            workers: None,
            no_communities: false,
        }
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = BuildConfig::default();
        apply_overrides(&mut config, &args()).unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = BuildConfig::default();
        let args = BuildArgs {
            mode: Some(ModeArg::Agent),
            workers: Some(3),
            no_communities: true,
            ..args()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.construction.mode, ConstructionMode::Agent);
        assert_eq!(config.construction.max_workers, 3);
        assert!(!config.community.enabled);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = BuildConfig::default();
        let args = BuildArgs {
            workers: Some(0),
            ..args()
        };
        assert!(matches!(
            apply_overrides(&mut config, &args),
            Err(CliError::Config(_))
        ));
    }
}
