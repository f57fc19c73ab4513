//! The `aptitude quota` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use aptitude_core::quota::{parse_quota_spec, QuotaConfig};

pub async fn execute(config: Option<PathBuf>, set: Vec<String>) -> Result<()> {
    let engine = super::open_engine(config).await?;

    if !set.is_empty() {
        let counts = set
            .iter()
            .map(|spec| parse_quota_spec(spec))
            .collect::<Result<Vec<_>, _>>()?;
        engine.set_quota_config(QuotaConfig::from_counts(counts)?).await?;
        println!("Quota table updated.");
    }

    let quota = engine.quota_config().await?;
    if quota.is_empty() {
        println!("No quota configured.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Type", "Count"]);
    for (key, count) in quota.iter() {
        table.add_row(vec![
            Cell::new(&key.category),
            Cell::new(key.answer_type),
            Cell::new(count),
        ]);
    }
    println!("{table}");
    println!("Total per candidate: up to {} questions", quota.total());

    Ok(())
}
