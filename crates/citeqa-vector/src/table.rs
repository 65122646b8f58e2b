//! LanceDB connection helpers.
use anyhow::{Context, Result};
use lancedb::{connect, Connection, Table};
use std::path::Path;

pub async fn open_db(db_dir: &Path) -> Result<Connection> {
	Ok(connect(db_dir.to_string_lossy().as_ref()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	let names = conn.table_names().execute().await?;
	Ok(names.iter().any(|n| n == name))
}

pub async fn open_table(conn: &Connection, name: &str) -> Result<Table> {
	if !table_exists(conn, name).await? { anyhow::bail!("vector table '{}' does not exist", name); }
	conn.open_table(name).execute().await.with_context(|| format!("Failed to open vector table '{}'", name))
}

/// Remove every table under `db_dir` so a build starts from nothing.
pub fn reset_db_dir(db_dir: &Path) -> Result<()> {
	if db_dir.exists() { std::fs::remove_dir_all(db_dir)?; }
	std::fs::create_dir_all(db_dir)?;
	Ok(())
}
