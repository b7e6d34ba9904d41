//! 파일 시스템 블롭 캐시
//!
//! 캐시 키별로 분석 결과(블롭)를 JSON 파일로 저장합니다.
//!
//! ```text
//! <root>/sha256/<64 hex>.json
//! ```
//!
//! 쓰기는 같은 디렉토리의 임시 파일에 기록한 뒤 rename하므로, 동시에 읽는
//! 쪽은 완성된 블롭이나 없음 둘 중 하나만 봅니다.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use strata_core::metrics as m;

use crate::error::CacheError;
use crate::key::{KEY_PREFIX, is_valid_key};

const BLOB_DIR: &str = "sha256";

/// 로컬 디렉토리 기반 블롭 캐시
#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    /// 캐시 디렉토리를 열거나 생성합니다.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        let blobs = root.join(BLOB_DIR);
        std::fs::create_dir_all(&blobs).map_err(|source| CacheError::Store {
            path: blobs.display().to_string(),
            source,
        })?;
        debug!(root = %root.display(), "opened blob cache");
        Ok(Self { root })
    }

    /// 캐시 루트 디렉토리
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        if !is_valid_key(key) {
            return Err(CacheError::InvalidKey(key.to_owned()));
        }
        let digest = &key[KEY_PREFIX.len()..];
        Ok(self.root.join(BLOB_DIR).join(format!("{digest}.json")))
    }

    /// 블롭을 저장합니다. 같은 키의 기존 블롭은 교체됩니다.
    pub fn put_blob<T: Serialize>(&self, key: &str, blob: &T) -> Result<(), CacheError> {
        let path = self.blob_path(key)?;
        let encoded = serde_json::to_vec(blob).map_err(|e| CacheError::Codec {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;

        let dir = self.root.join(BLOB_DIR);
        let store_err = |source: std::io::Error| CacheError::Store {
            path: path.display().to_string(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(store_err)?;
        tmp.write_all(&encoded).map_err(store_err)?;
        tmp.persist(&path).map_err(|e| store_err(e.error))?;

        debug!(key, bytes = encoded.len(), "stored blob");
        Ok(())
    }

    /// 블롭을 읽습니다. 없으면 `None`.
    pub fn get_blob<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let path = self.blob_path(key)?;
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                counter!(m::CACHE_MISSES_TOTAL).increment(1);
                return Ok(None);
            }
            Err(source) => {
                return Err(CacheError::Store {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let blob = serde_json::from_slice(&data).map_err(|e| CacheError::Codec {
            key: key.to_owned(),
            reason: e.to_string(),
        })?;
        counter!(m::CACHE_HITS_TOTAL).increment(1);
        Ok(Some(blob))
    }

    /// 주어진 키 중 캐시에 없는 것만 입력 순서대로 반환합니다.
    pub fn missing_blobs(&self, keys: &[String]) -> Result<Vec<String>, CacheError> {
        let mut missing = Vec::new();
        for key in keys {
            let path = self.blob_path(key)?;
            if path.is_file() {
                counter!(m::CACHE_HITS_TOTAL).increment(1);
            } else {
                counter!(m::CACHE_MISSES_TOTAL).increment(1);
                missing.push(key.clone());
            }
        }
        Ok(missing)
    }

    /// 모든 블롭을 삭제합니다.
    pub fn clear(&self) -> Result<(), CacheError> {
        let blobs = self.root.join(BLOB_DIR);
        match std::fs::remove_dir_all(&blobs) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Store {
                    path: blobs.display().to_string(),
                    source,
                });
            }
        }
        std::fs::create_dir_all(&blobs).map_err(|source| CacheError::Store {
            path: blobs.display().to_string(),
            source,
        })?;
        info!(root = %self.root.display(), "cleared blob cache");
        Ok(())
    }
}
