//! The `aptitude import` command.

use std::path::PathBuf;

use anyhow::Result;

use aptitude_core::parser::{parse_catalog, validate_catalog};

pub async fn execute(config: Option<PathBuf>, catalog_path: PathBuf) -> Result<()> {
    let catalog = parse_catalog(&catalog_path)?;
    for w in validate_catalog(&catalog) {
        tracing::warn!(
            "{}: {}",
            w.record_id.as_deref().unwrap_or("catalog"),
            w.message
        );
    }

    let engine = super::open_engine(config).await?;
    let summary = engine.import_catalog(catalog).await?;

    println!(
        "Imported {} departments, {} questions, {} candidates",
        summary.departments, summary.questions, summary.candidates
    );
    if summary.quota_replaced {
        println!("Quota table replaced.");
    }

    Ok(())
}
