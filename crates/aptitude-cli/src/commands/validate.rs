//! The `aptitude validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(catalog_path: PathBuf) -> Result<()> {
    let catalog = aptitude_core::parser::parse_catalog(&catalog_path)?;

    println!(
        "Catalog: {} departments, {} questions, {} candidates{}",
        catalog.departments.len(),
        catalog.questions.len(),
        catalog.candidates.len(),
        if catalog.quota.is_some() { ", quota table" } else { "" }
    );

    let warnings = aptitude_core::parser::validate_catalog(&catalog);
    for w in &warnings {
        let prefix = w
            .record_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Catalog valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
