//! `strata cache-key` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use strata_cache::{AnalyzerVersions, ArtifactOption, FsCache, calc_key};
use strata_core::config::StrataConfig;

use crate::cli::CacheKeyArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Analyzers this binary runs over layer contents. Bump on behavior change.
const ANALYZERS: &[(&str, u32)] = &[("file-digest", 1)];

/// Execute the `cache-key` command.
pub async fn execute(
    args: CacheKeyArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = StrataConfig::load(config_path).await?;
    let report = derive(&config, &args.id, args.check_cache).await?;
    writer.render(&report)?;
    Ok(())
}

/// Derive the cache key for `id` and optionally look it up in the blob store.
///
/// Policy, data and secret files are hashed on a blocking worker.
pub async fn derive(
    config: &StrataConfig,
    id: &str,
    check_cache: bool,
) -> Result<CacheKeyReport, CliError> {
    let option = ArtifactOption::from_core(&config.walker, &config.cache);
    let versions = analyzer_versions();
    let key_id = id.to_owned();

    let key = tokio::task::spawn_blocking(move || {
        calc_key(&key_id, &versions, &BTreeMap::new(), &option)
    })
    .await
    .map_err(|e| CliError::Command(format!("spawn_blocking failed: {e}")))??;

    info!(id, key = %key, "derived cache key");

    let cached = if check_cache {
        let cache = FsCache::new(&config.general.cache_dir)?;
        let missing = cache.missing_blobs(std::slice::from_ref(&key))?;
        Some(missing.is_empty())
    } else {
        None
    };

    Ok(CacheKeyReport {
        id: id.to_owned(),
        key,
        cache_dir: check_cache.then(|| config.general.cache_dir.clone()),
        cached,
    })
}

pub(crate) fn analyzer_versions() -> AnalyzerVersions {
    AnalyzerVersions {
        analyzers: ANALYZERS
            .iter()
            .map(|(name, version)| ((*name).to_owned(), *version))
            .collect(),
        post_analyzers: BTreeMap::new(),
    }
}

/// Cache key derivation report.
#[derive(Debug, Serialize)]
pub struct CacheKeyReport {
    /// Artifact identifier
    pub id: String,
    /// Derived key (`sha256:<hex>`)
    pub key: String,
    /// Blob store directory, present when the cache was checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    /// Whether a blob exists for the key, present when the cache was checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl Render for CacheKeyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", self.key.bold())?;
        if let (Some(dir), Some(cached)) = (&self.cache_dir, self.cached) {
            let status = if cached {
                "HIT".green()
            } else {
                "MISS".yellow()
            };
            writeln!(w, "  Cache: {} ({})", status, dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_derive_is_stable_for_same_config() {
        let config = StrataConfig::default();
        let a = derive(&config, "sha256:image", false).await.expect("key");
        let b = derive(&config, "sha256:image", false).await.expect("key");

        assert_eq!(a.key, b.key);
        assert!(strata_cache::is_valid_key(&a.key));
        assert!(a.cached.is_none());
    }

    #[tokio::test]
    async fn test_derive_changes_with_skip_dirs() {
        let mut config = StrataConfig::default();
        let before = derive(&config, "id", false).await.expect("key");
        config.walker.skip_dirs.push("var/cache".to_owned());
        let after = derive(&config, "id", false).await.expect("key");

        assert_ne!(before.key, after.key);
    }

    #[tokio::test]
    async fn test_derive_checks_cache() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let mut config = StrataConfig::default();
        config.general.cache_dir = dir.path().display().to_string();

        let miss = derive(&config, "id", true).await.expect("key");
        assert_eq!(miss.cached, Some(false));

        let cache = FsCache::new(dir.path()).expect("cache");
        cache
            .put_blob(&miss.key, &serde_json::json!({"files": 1}))
            .expect("put blob");

        let hit = derive(&config, "id", true).await.expect("key");
        assert_eq!(hit.cached, Some(true));
    }

    #[tokio::test]
    async fn test_derive_missing_policy_fails() {
        let mut config = StrataConfig::default();
        config.cache.policy_paths = vec!["/nonexistent/strata/policy".to_owned()];

        let err = derive(&config, "id", false).await.expect_err("should fail");
        assert!(matches!(err, CliError::Cache(_)));
    }
}
