//! The `aptitude rank` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(config: Option<PathBuf>, candidate_id: String) -> Result<()> {
    let engine = super::open_engine(config).await?;
    let rank = engine.get_rank(&candidate_id).await?;
    println!("{candidate_id}: rank {rank}");
    Ok(())
}
