//! The `aptitude leaderboard` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use aptitude_core::report::Leaderboard;

pub async fn execute(config: Option<PathBuf>, format: String) -> Result<()> {
    let engine = super::open_engine(config).await?;
    let board = engine.leaderboard().await?;

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", board.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&board)?);
        }
        _ => print_table(&board),
    }

    Ok(())
}

fn print_table(board: &Leaderboard) {
    if board.entries.is_empty() {
        println!("No results yet.");
        return;
    }

    let groups = board.group_names();
    let mut header = vec!["Rank".to_string(), "Candidate".into(), "Department".into()];
    header.extend(groups.iter().cloned());
    header.push("Total".into());

    let mut table = Table::new();
    table.set_header(header);

    for entry in &board.entries {
        let name = if entry.candidate_name.is_empty() {
            &entry.candidate_id
        } else {
            &entry.candidate_name
        };
        let mut row = vec![
            Cell::new(entry.rank),
            Cell::new(name),
            Cell::new(entry.department.as_deref().unwrap_or("-")),
        ];
        for group in &groups {
            row.push(Cell::new(entry.scores.get(group).copied().unwrap_or(0)));
        }
        row.push(Cell::new(entry.total_score));
        table.add_row(row);
    }

    println!("{table}");
}
