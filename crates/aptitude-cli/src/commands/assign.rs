//! The `aptitude assign` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(config: Option<PathBuf>, candidate_id: String) -> Result<()> {
    let engine = super::open_engine(config).await?;
    let drawn = engine.assign_once(&candidate_id).await?;

    let status = if drawn.is_fresh() { "new" } else { "existing" };
    println!(
        "Assigned {} questions to {} ({status})",
        drawn.question_ids().len(),
        drawn.candidate_id
    );
    for id in drawn.question_ids() {
        println!("  {id}");
    }

    Ok(())
}
