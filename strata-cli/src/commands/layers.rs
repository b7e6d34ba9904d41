//! `strata layers` command handler
//!
//! Each layer is keyed by the digest of its archive bytes plus the scan
//! options. Layers whose key is already in the blob cache are loaded instead
//! of walked, and freshly walked layers are stored for the next run.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use strata_cache::{ArtifactOption, FsCache, calc_key};
use strata_core::config::StrataConfig;
use strata_walker::{
    CachedFile, FileInfo, LayerContents, LayerSource, LayerTar, MergedView, WalkerConfig,
    WalkerError, resolve_bottom_up, walk_layers,
};

use crate::cli::LayersArgs;
use crate::commands::cache_key::analyzer_versions;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `layers` command.
pub async fn execute(
    args: LayersArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = StrataConfig::load(config_path).await?;

    let mut walker_config = WalkerConfig::from_core(&config.walker);
    walker_config.slow |= args.slow;
    if args.sequential {
        walker_config.parallel_layers = false;
    }
    walker_config.validate()?;

    let cache = if args.no_cache {
        None
    } else {
        Some(FsCache::new(&config.general.cache_dir)?)
    };
    let sources: Vec<LayerSource> = args.layers.iter().map(LayerSource::from_path).collect();

    let cancel = CancellationToken::new();
    let watcher = spawn_abort_watch(cancel.clone(), args.timeout.map(Duration::from_secs));
    let layers = collect_layers(&config, &walker_config, sources, cache.as_ref(), cancel).await;
    watcher.abort();

    let report = build_layers_report(&layers?);
    writer.render(&report)?;

    Ok(())
}

/// Cancel `token` on Ctrl-C or once `timeout` elapses.
///
/// The walker checks the token between entries, so the walk stops at the next
/// entry boundary and the command exits with [`CliError::Cancelled`].
fn spawn_abort_watch(token: CancellationToken, timeout: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for interrupt");
                std::future::pending::<()>().await;
            }
        };
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = interrupt => info!("interrupt received, cancelling layer walk"),
            () = deadline => info!(
                timeout_secs = timeout.map(|t| t.as_secs()),
                "timeout reached, cancelling layer walk"
            ),
            () = token.cancelled() => return,
        }
        token.cancel();
    })
}

/// Per-file record collected while walking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FileDigest {
    size: u64,
    mode: u32,
    sha256: String,
}

/// One layer's contents and whether they came from the blob cache.
#[derive(Debug)]
struct CollectedLayer {
    contents: LayerContents<FileDigest>,
    cached: bool,
}

/// Load cached layers, walk the rest and store what was walked.
///
/// Results are returned in the order of `sources`.
async fn collect_layers(
    config: &StrataConfig,
    walker_config: &WalkerConfig,
    sources: Vec<LayerSource>,
    cache: Option<&FsCache>,
    cancel: CancellationToken,
) -> Result<Vec<CollectedLayer>, CliError> {
    let total = sources.len();
    let keys: Vec<Option<String>> = match cache {
        Some(_) => layer_keys(config, &sources).await?.into_iter().map(Some).collect(),
        None => vec![None; total],
    };

    let mut slots: Vec<Option<CollectedLayer>> = Vec::with_capacity(total);
    let mut pending = Vec::new();
    for (index, (source, key)) in sources.into_iter().zip(&keys).enumerate() {
        let hit = match (cache, key) {
            (Some(cache), Some(key)) => cache.get_blob::<LayerContents<FileDigest>>(key)?,
            _ => None,
        };
        match hit {
            Some(mut contents) => {
                debug!(layer = %source.id, key = ?key, "layer served from cache");
                contents.layer_id = source.id;
                slots.push(Some(CollectedLayer {
                    contents,
                    cached: true,
                }));
            }
            None => {
                slots.push(None);
                pending.push((index, source));
            }
        }
    }
    let (indices, to_walk): (Vec<usize>, Vec<LayerSource>) = pending.into_iter().unzip();

    let walker = Arc::new(LayerTar::new(walker_config)?);
    info!(
        layers = total,
        cached = total - to_walk.len(),
        parallel = walker_config.parallel_layers,
        threshold = walker.threshold(),
        "walking layers"
    );

    let walked = walk_layers(
        walker,
        to_walk,
        walker_config.parallel_layers,
        cancel,
        digest_entry,
    )
    .await?;

    for (index, contents) in indices.into_iter().zip(walked) {
        if let (Some(cache), Some(key)) = (cache, &keys[index])
            && let Err(e) = cache.put_blob(key, &contents)
        {
            warn!(layer = %contents.layer_id, error = %e, "failed to store layer in cache");
        }
        slots[index] = Some(CollectedLayer {
            contents,
            cached: false,
        });
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Derive one cache key per layer from its archive digest and the scan options.
async fn layer_keys(
    config: &StrataConfig,
    sources: &[LayerSource],
) -> Result<Vec<String>, CliError> {
    let option = ArtifactOption::from_core(&config.walker, &config.cache);
    let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();

    tokio::task::spawn_blocking(move || {
        let versions = analyzer_versions();
        paths
            .iter()
            .map(|path| {
                let digest = layer_digest(path)?;
                Ok(calc_key(&digest, &versions, &BTreeMap::new(), &option)?)
            })
            .collect::<Result<Vec<_>, CliError>>()
    })
    .await
    .map_err(|e| CliError::Command(format!("spawn_blocking failed: {e}")))?
}

fn layer_digest(path: &Path) -> Result<String, CliError> {
    let open_err = |source: io::Error| WalkerError::Open {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::open(path).map_err(open_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(open_err)?;
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

fn digest_entry(
    _path: &str,
    info: &FileInfo,
    file: &mut CachedFile<'_>,
) -> Result<Option<FileDigest>, strata_walker::AnalyzeError> {
    if info.is_dir() {
        return Ok(None);
    }

    let mut hasher = Sha256::new();
    let mut reader = file.open()?;
    io::copy(&mut reader, &mut hasher)?;

    Ok(Some(FileDigest {
        size: info.size,
        mode: info.mode,
        sha256: hex::encode(hasher.finalize()),
    }))
}

fn build_layers_report(layers: &[CollectedLayer]) -> LayersReport {
    let contents: Vec<LayerContents<FileDigest>> =
        layers.iter().map(|l| l.contents.clone()).collect();
    let view: MergedView<FileDigest> = resolve_bottom_up(&contents);

    let files = view
        .into_iter()
        .map(|(path, visible)| FileEntry {
            path,
            layer: contents[visible.layer_index].layer_id.clone(),
            size: visible.value.size,
            mode: format!("{:o}", visible.value.mode),
            sha256: visible.value.sha256,
        })
        .collect();

    LayersReport {
        layers: layers
            .iter()
            .map(|l| LayerSummary {
                id: l.contents.layer_id.clone(),
                files: l.contents.files.len(),
                opaque_dirs: l.contents.opaque_dirs.len(),
                whiteouts: l.contents.whiteout_files.len(),
                cached: l.cached,
            })
            .collect(),
        files,
    }
}

/// Merged layer view report.
#[derive(Serialize)]
pub struct LayersReport {
    /// Walked layers, oldest first
    pub layers: Vec<LayerSummary>,
    /// Visible files after union resolution, sorted by path
    pub files: Vec<FileEntry>,
}

/// Per-layer walk summary.
#[derive(Serialize)]
pub struct LayerSummary {
    pub id: String,
    pub files: usize,
    pub opaque_dirs: usize,
    pub whiteouts: usize,
    /// Loaded from the blob cache instead of walked
    pub cached: bool,
}

/// One visible file.
#[derive(Serialize)]
pub struct FileEntry {
    pub path: String,
    /// Layer the file comes from
    pub layer: String,
    pub size: u64,
    /// Permission bits in octal
    pub mode: String,
    pub sha256: String,
}

impl Render for LayersReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", "Layers".bold())?;
        for (index, layer) in self.layers.iter().enumerate() {
            writeln!(
                w,
                "  {:>2}  {}  files={} opaque={} whiteouts={}{}",
                index,
                layer.id,
                layer.files,
                layer.opaque_dirs,
                layer.whiteouts,
                if layer.cached { "  (cached)" } else { "" }
            )?;
        }

        writeln!(w)?;
        writeln!(w, "{} ({})", "Visible files".bold(), self.files.len())?;
        if self.files.is_empty() {
            writeln!(w, "  (none)")?;
            return Ok(());
        }

        let path_width = self
            .files
            .iter()
            .map(|f| f.path.len())
            .max()
            .unwrap_or(4)
            .max(4);
        writeln!(
            w,
            "  {:<path_width$}  {:>10}  {:>6}  {:<12}  LAYER",
            "PATH", "SIZE", "MODE", "SHA256"
        )?;
        for f in &self.files {
            writeln!(
                w,
                "  {:<path_width$}  {:>10}  {:>6}  {:<12}  {}",
                f.path,
                f.size,
                f.mode,
                &f.sha256[..12.min(f.sha256.len())],
                f.layer.dimmed()
            )?;
        }

        Ok(())
    }
}
