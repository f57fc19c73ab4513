//! The `aptitude delete-department` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(config: Option<PathBuf>, department_id: String) -> Result<()> {
    let engine = super::open_engine(config).await?;
    let touched = engine.delete_department(&department_id).await?;
    println!("Deleted department {department_id} ({touched} questions updated)");
    Ok(())
}
