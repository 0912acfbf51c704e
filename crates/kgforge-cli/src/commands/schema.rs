//! Schema command implementation.

use crate::cli::{SchemaAction, SchemaArgs};
use crate::error::Result;
use kgforge_builder::BuildConfig;
use kgforge_store::SchemaFile;

/// Execute the schema command.
pub fn execute_schema(args: SchemaArgs, config: &BuildConfig) -> Result<()> {
    match args.action {
        SchemaAction::Show { dataset } => {
            let file = SchemaFile::new(&config.dataset(&dataset)?.schema_path);
            let schema = file.load_or_default()?;
            if !file.exists() {
                eprintln!("{} does not exist yet, showing an empty schema", file.path().display());
            }
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}
