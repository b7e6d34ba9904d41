//! 단일 레이어 순회기
//!
//! [`LayerTar::walk`]는 tar 스트림의 엔트리를 아카이브 순서대로 하나씩 처리합니다.
//!
//! # 엔트리 처리 순서
//!
//! 1. 경로 정규화 후 디렉토리/파일 이름 분리
//! 2. `.wh..wh..opq` → opaque 디렉토리로 기록
//! 3. `.wh.` 접두어 → whiteout 대상으로 기록
//! 4. 디렉토리 자신이나 상위 디렉토리가 skip-dir 규칙에 맞으면 기록하고 하위 엔트리 전부 제외
//! 5. 일반 파일이 skip-file 규칙에 맞으면 제외
//! 6. 심볼릭 링크, 하드 링크, 기타 타입 제외
//! 7. 나머지는 [`CachedFile`]로 감싸 분석 콜백 호출, 반환 직후 정리
//!
//! 콜백 에러와 아카이브 읽기 에러는 해당 레이어 순회를 즉시 중단시킵니다.

use std::io::Read;

use metrics::counter;
use serde::Serialize;
use tar::EntryType;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use strata_core::metrics as m;

use crate::cached_file::CachedFile;
use crate::config::WalkerConfig;
use crate::error::{AnalyzeError, WalkerError};
use crate::skip::{SkipRules, clean_path, under_skipped_dir};

/// opaque 디렉토리 마커 파일 이름
pub const OPAQUE_MARKER: &str = ".wh..wh..opq";

/// whiteout 마커 접두어
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// 엔트리 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// 일반 파일
    Regular,
    /// 디렉토리
    Directory,
    /// 심볼릭 링크
    Symlink,
    /// 하드 링크
    Hardlink,
    /// whiteout 마커
    Whiteout,
    /// opaque 디렉토리 마커
    OpaqueDir,
    /// 장치 파일, FIFO 등
    Other,
}

impl EntryKind {
    /// 파일 이름과 tar 타입 플래그로 엔트리를 분류합니다.
    ///
    /// 마커 이름이 타입 플래그보다 우선합니다.
    pub fn classify(file_name: &str, entry_type: EntryType) -> Self {
        if file_name == OPAQUE_MARKER {
            return Self::OpaqueDir;
        }
        if file_name.starts_with(WHITEOUT_PREFIX) {
            return Self::Whiteout;
        }
        match entry_type {
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => Self::Regular,
            EntryType::Directory => Self::Directory,
            EntryType::Symlink => Self::Symlink,
            EntryType::Link => Self::Hardlink,
            _ => Self::Other,
        }
    }
}

/// 분석 콜백에 전달되는 엔트리 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// 파일 이름 (마지막 경로 요소)
    pub name: String,
    /// 선언된 크기 (바이트)
    pub size: u64,
    /// 권한 비트
    pub mode: u32,
    /// 수정 시각 (유닉스 초)
    pub mtime: u64,
    /// 엔트리 종류 (`Regular` 또는 `Directory`)
    pub kind: EntryKind,
}

impl FileInfo {
    /// 디렉토리 여부
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// 한 레이어 순회의 결과
///
/// 유니온 해석기가 하위 레이어의 경로를 숨기는 데 사용합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerMarkers {
    /// opaque 디렉토리 (끝 `/` 없음, 루트는 빈 문자열)
    pub opaque_dirs: Vec<String>,
    /// whiteout 대상 경로
    pub whiteout_files: Vec<String>,
    /// 이 레이어에서 건너뛴 디렉토리
    pub skipped_dirs: Vec<String>,
}

/// tar 레이어 순회기
///
/// 순회 간 공유 상태가 없으므로 여러 레이어에서 동시에 사용할 수 있습니다.
#[derive(Debug, Clone)]
pub struct LayerTar {
    rules: SkipRules,
    threshold: u64,
}

impl LayerTar {
    /// 설정으로 순회기를 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 또는 glob 컴파일 실패 시 에러 반환
    pub fn new(config: &WalkerConfig) -> Result<Self, WalkerError> {
        config.validate()?;
        Ok(Self {
            rules: SkipRules::new(&config.skip_files, &config.skip_dirs)?,
            threshold: config.size_threshold(),
        })
    }

    /// 메모리 임계값
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// 레이어 하나를 순회합니다.
    ///
    /// `cancel`은 엔트리 사이마다 확인합니다. 취소되면 현재 엔트리의 자원을
    /// 정리한 뒤 `WalkerError::Cancelled`를 반환합니다.
    pub fn walk<R, F>(
        &self,
        layer_id: &str,
        layer: R,
        cancel: &CancellationToken,
        mut analyze: F,
    ) -> Result<LayerMarkers, WalkerError>
    where
        R: Read,
        F: FnMut(&str, &FileInfo, &mut CachedFile<'_>) -> Result<(), AnalyzeError>,
    {
        let archive_err = |source: std::io::Error| WalkerError::Archive {
            layer: layer_id.to_owned(),
            source,
        };

        let mut markers = LayerMarkers::default();
        let mut analyzed = 0u64;
        let mut archive = tar::Archive::new(layer);

        debug!(layer = %layer_id, threshold = self.threshold, "walking layer");

        for entry in archive.entries().map_err(archive_err)? {
            if cancel.is_cancelled() {
                debug!(layer = %layer_id, "walk cancelled");
                return Err(WalkerError::Cancelled {
                    layer: layer_id.to_owned(),
                });
            }

            let mut entry = entry.map_err(archive_err)?;
            let raw_path = entry.path().map_err(archive_err)?;
            let file_path = clean_path(&raw_path.to_string_lossy());
            if file_path.is_empty() {
                continue;
            }
            let (file_dir, file_name) = split_path(&file_path);

            let header = entry.header();
            let kind = EntryKind::classify(file_name, header.entry_type());

            match kind {
                EntryKind::OpaqueDir => {
                    trace!(layer = %layer_id, dir = file_dir, "opaque directory");
                    markers.opaque_dirs.push(file_dir.to_owned());
                    continue;
                }
                EntryKind::Whiteout => {
                    let target = join_path(file_dir, &file_name[WHITEOUT_PREFIX.len()..]);
                    trace!(layer = %layer_id, target = %target, "whiteout");
                    markers.whiteout_files.push(target);
                    continue;
                }
                EntryKind::Directory => {
                    if self.rules.should_skip_dir(&file_path) {
                        count_skip("skip_dir");
                        if !under_skipped_dir(&file_path, &markers.skipped_dirs) {
                            debug!(layer = %layer_id, path = %file_path, "skipping directory");
                            markers.skipped_dirs.push(file_path);
                        }
                        continue;
                    }
                }
                EntryKind::Regular => {
                    if self.rules.should_skip_file(&file_path) {
                        trace!(layer = %layer_id, path = %file_path, "skipping file");
                        count_skip("skip_file");
                        continue;
                    }
                }
                EntryKind::Symlink | EntryKind::Hardlink | EntryKind::Other => {
                    count_skip("link");
                    continue;
                }
            }

            if under_skipped_dir(&file_path, &markers.skipped_dirs) {
                count_skip("under_skip_dir");
                continue;
            }
            // 디렉토리 헤더가 없거나 늦게 나오는 레이어
            if let Some(dir) = self.rules.skipped_ancestor(&file_path) {
                debug!(layer = %layer_id, path = %dir, "skipping directory");
                count_skip("under_skip_dir");
                markers.skipped_dirs.push(dir.to_owned());
                continue;
            }

            let info = FileInfo {
                name: file_name.to_owned(),
                // sparse 엔트리는 펼친 크기
                size: entry.size(),
                mode: header.mode().map_err(archive_err)?,
                mtime: header.mtime().map_err(archive_err)?,
                kind,
            };

            let mut cached = CachedFile::new(&mut entry, info.size, self.threshold);
            let result = analyze(&file_path, &info, &mut cached);
            cached.clean();

            result.map_err(|source| WalkerError::Analyze {
                path: file_path.clone(),
                source,
            })?;
            analyzed += 1;
        }

        counter!(m::WALKER_LAYERS_TOTAL).increment(1);
        counter!(m::WALKER_FILES_ANALYZED_TOTAL).increment(analyzed);
        info!(
            layer = %layer_id,
            analyzed,
            opaque_dirs = markers.opaque_dirs.len(),
            whiteouts = markers.whiteout_files.len(),
            skipped_dirs = markers.skipped_dirs.len(),
            "layer walked"
        );

        Ok(markers)
    }
}

fn count_skip(reason: &'static str) {
    counter!(m::WALKER_ENTRIES_SKIPPED_TOTAL, m::LABEL_REASON => reason).increment(1);
}

/// 정규화된 경로를 (디렉토리, 파일 이름)으로 나눕니다. 디렉토리에는 끝 `/`가 없습니다.
fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}
