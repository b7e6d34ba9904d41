//! 레이어 파일 열기와 다중 레이어 순회
//!
//! [`open_layer`]는 레이어 파일이 gzip(`1f 8b`)인지 확인해 압축을 풀어 주는
//! 리더를 반환합니다. [`walk_layers`]는 레이어마다 blocking 워커에서 순회를
//! 실행하고 모든 레이어가 끝날 때까지 기다린 뒤 결과를 레이어 순서대로
//! 돌려줍니다. 병합은 호출자가 [`resolve_bottom_up`](crate::resolve_bottom_up)
//! 등으로 수행합니다.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cached_file::CachedFile;
use crate::error::{AnalyzeError, WalkerError};
use crate::union::LayerContents;
use crate::walker::{FileInfo, LayerTar};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 순회할 레이어 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
    /// 레이어 식별자 (다이제스트 또는 파일 이름)
    pub id: String,
    /// 레이어 파일 경로 (tar 또는 tar.gz)
    pub path: PathBuf,
}

impl LayerSource {
    /// 파일 이름을 식별자로 사용하는 레이어 소스를 생성합니다.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { id, path }
    }
}

/// 레이어 파일을 열고 필요하면 gzip 압축을 풉니다.
pub fn open_layer(path: &Path) -> Result<Box<dyn Read + Send>, WalkerError> {
    let open_err = |source: std::io::Error| WalkerError::Open {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(open_err)?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader.fill_buf().map_err(open_err)?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        debug!(path = %path.display(), "gzip layer detected");
        Ok(Box::new(flate2::bufread::GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// 여러 레이어를 순회하고 레이어별 결과를 오래된 순서대로 반환합니다.
///
/// `analyze`가 `Some(value)`를 반환한 경로만 결과에 기록됩니다.
/// `parallel`이면 모든 레이어를 동시에 순회하고 모두 끝날 때까지 기다립니다.
/// 한 레이어가 실패하면 나머지 레이어에 취소를 전파하고, 취소가 아닌 첫 에러를
/// 반환합니다.
pub async fn walk_layers<T, F>(
    walker: Arc<LayerTar>,
    layers: Vec<LayerSource>,
    parallel: bool,
    cancel: CancellationToken,
    analyze: F,
) -> Result<Vec<LayerContents<T>>, WalkerError>
where
    T: Send + 'static,
    F: Fn(&str, &FileInfo, &mut CachedFile<'_>) -> Result<Option<T>, AnalyzeError>
        + Send
        + Sync
        + 'static,
{
    let analyze = Arc::new(analyze);
    let token = cancel.child_token();
    let mut results = Vec::with_capacity(layers.len());

    if parallel {
        let handles: Vec<_> = layers
            .into_iter()
            .map(|source| spawn_walk(&walker, source, &token, &analyze))
            .collect();
        // fork-join: 병합 전에 모든 레이어가 끝나야 함
        for handle in handles {
            results.push(join(handle).await);
        }
    } else {
        for source in layers {
            let result = join(spawn_walk(&walker, source, &token, &analyze)).await;
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }
    }

    let mut contents = Vec::with_capacity(results.len());
    let mut first_err: Option<WalkerError> = None;
    for result in results {
        match result {
            Ok(layer) => contents.push(layer),
            Err(e) => {
                let replace = match &first_err {
                    None => true,
                    Some(WalkerError::Cancelled { .. }) => {
                        !matches!(e, WalkerError::Cancelled { .. })
                    }
                    Some(_) => false,
                };
                if replace {
                    first_err = Some(e);
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(contents),
    }
}

type WalkHandle<T> = tokio::task::JoinHandle<Result<LayerContents<T>, WalkerError>>;

fn spawn_walk<T, F>(
    walker: &Arc<LayerTar>,
    source: LayerSource,
    token: &CancellationToken,
    analyze: &Arc<F>,
) -> WalkHandle<T>
where
    T: Send + 'static,
    F: Fn(&str, &FileInfo, &mut CachedFile<'_>) -> Result<Option<T>, AnalyzeError>
        + Send
        + Sync
        + 'static,
{
    let walker = Arc::clone(walker);
    let token = token.clone();
    let analyze = Arc::clone(analyze);
    tokio::task::spawn_blocking(move || {
        let result = walk_one(&walker, &source, &token, analyze.as_ref());
        if let Err(e) = &result
            && !matches!(e, WalkerError::Cancelled { .. })
        {
            warn!(layer = %source.id, error = %e, "layer walk failed, cancelling siblings");
            token.cancel();
        }
        result
    })
}

async fn join<T>(handle: WalkHandle<T>) -> Result<LayerContents<T>, WalkerError> {
    handle
        .await
        .map_err(|e| WalkerError::Task(format!("spawn_blocking failed: {e}")))?
}

fn walk_one<T, F>(
    walker: &LayerTar,
    source: &LayerSource,
    cancel: &CancellationToken,
    analyze: &F,
) -> Result<LayerContents<T>, WalkerError>
where
    F: Fn(&str, &FileInfo, &mut CachedFile<'_>) -> Result<Option<T>, AnalyzeError>,
{
    let reader = open_layer(&source.path)?;
    let mut contents = LayerContents::new(source.id.clone());
    let markers = walker.walk(&source.id, reader, cancel, |path, info, file| {
        if let Some(value) = analyze(path, info, file)? {
            contents.files.insert(path.to_owned(), value);
        }
        Ok(())
    })?;
    Ok(contents.with_markers(markers))
}
