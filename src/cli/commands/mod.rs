//! Command handlers.

pub mod gate;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::domain::models::{Config, Plan};
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from `path`, or from the project directory and environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Read a whole file, or stdin when `path` is `-`.
pub async fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Read and parse a JSON plan from a file or stdin.
pub async fn read_plan(path: &Path) -> Result<Plan> {
    let raw = read_input(path).await?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse plan {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_plan_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(
            &path,
            r#"{"objective":"Ship","tasks":[{"id":1,"agent_role":"coder","description":"Build"}]}"#,
        )
        .unwrap();

        let plan = read_plan(&path).await.unwrap();
        assert_eq!(plan.objective, "Ship");
        assert_eq!(plan.len(), 1);
    }

    #[tokio::test]
    async fn test_read_plan_reports_path_on_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_plan(&path).await.unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taskmend.yaml");
        fs::write(&path, "scheduler:\n  max_concurrency: 3\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.scheduler.max_concurrency, 3);
    }
}
