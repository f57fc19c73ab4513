//! The `aptitude review` command.

use std::path::PathBuf;

use anyhow::Result;

pub async fn execute(config: Option<PathBuf>, candidate_id: String, format: String) -> Result<()> {
    let engine = super::open_engine(config).await?;
    let review = engine.answer_review(&candidate_id).await?;

    match format.as_str() {
        "markdown" | "md" => println!("{}", review.to_markdown()),
        "json" => println!("{}", serde_json::to_string_pretty(&review)?),
        _ => {
            println!(
                "{} ({}): {}/{} points, rank {}",
                review.candidate_name,
                review.candidate_id,
                review.total_score,
                review.points_possible,
                review.rank
            );
            for o in &review.outcomes {
                let mark = if o.correct { "OK" } else { "--" };
                println!(
                    "  [{mark}] {} ({}) {}/{}: {}",
                    o.question_id,
                    o.category,
                    o.points_earned,
                    o.points_possible,
                    o.answer.as_deref().unwrap_or("(no answer)")
                );
            }
        }
    }

    Ok(())
}
