//! The `aptitude submit` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub async fn execute(
    config: Option<PathBuf>,
    candidate_id: String,
    answers_path: PathBuf,
) -> Result<()> {
    let content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answers: {}", answers_path.display()))?;
    let answers: BTreeMap<String, String> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers: {}", answers_path.display()))?;

    let engine = super::open_engine(config).await?;
    let result = engine.grade_and_submit(&candidate_id, answers).await?;

    println!(
        "Submitted {}: {} points, rank {}",
        result.candidate_id, result.total_score, result.rank
    );
    for (group, points) in &result.scores {
        println!("  {group}: {points}");
    }

    Ok(())
}
