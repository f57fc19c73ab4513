pub mod assign;
pub mod delete_department;
pub mod import;
pub mod init;
pub mod leaderboard;
pub mod quota;
pub mod rank;
pub mod review;
pub mod submit;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use aptitude_core::config::load_config_from;
use aptitude_core::store::JsonDirStore;
use aptitude_core::ExamEngine;

/// Load config and open an engine over its data directory.
pub async fn open_engine(config_path: Option<PathBuf>) -> Result<ExamEngine> {
    let config = load_config_from(config_path.as_deref())?;
    let store = JsonDirStore::open(&config.data_dir).await?;
    tracing::debug!("using data directory {}", config.data_dir.display());
    Ok(ExamEngine::from_config(Arc::new(store), &config))
}
