//! 보안 권고 소스
//!
//! [`AdvisorySource`]는 `(플랫폼, 패키지 이름)`으로 권고 목록을 조회하는 추상화입니다.
//! 스캐너는 이 trait만 알고, 저장 형식은 모릅니다.
//!
//! [`AdvisoryDb`]는 로컬 디렉토리의 JSON 파일을 읽어 메모리에 인덱싱하는 기본 구현입니다.
//!
//! # 플랫폼 이름
//!
//! | 배포판 | 플랫폼 |
//! |--------|--------|
//! | AlmaLinux 8 | `alma 8` |
//! | Amazon Linux 2 | `amazon linux 2` |
//! | EPEL 7 | `epel 7` |

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use strata_core::types::{Advisory, DataSource};

use crate::error::DetectorError;

/// 권고 DB 파일 최대 크기 (50 MB)
const MAX_ADVISORY_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 전체 권고 엔트리 최대 개수
const MAX_ADVISORY_ENTRIES: usize = 1_000_000;

/// AlmaLinux 플랫폼 이름
pub fn alma_platform(major: &str) -> String {
    format!("alma {major}")
}

/// Amazon Linux 플랫폼 이름
pub fn amazon_platform(version: &str) -> String {
    format!("amazon linux {version}")
}

/// EPEL 플랫폼 이름
pub fn epel_platform(version: &str) -> String {
    format!("epel {version}")
}

/// 권고 조회 추상화
pub trait AdvisorySource: Send + Sync {
    /// 소스 이름 (로그/에러용)
    fn name(&self) -> &str;

    /// 플랫폼과 패키지 이름으로 권고 목록을 조회합니다.
    ///
    /// 권고가 없으면 빈 목록을 반환합니다. 에러는 저장소 자체의 실패만 뜻합니다.
    fn get(&self, platform: &str, pkg_name: &str) -> Result<Vec<Advisory>, DetectorError>;
}

/// 권고 DB 파일의 엔트리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryEntry {
    /// 플랫폼 (예: `alma 8`)
    pub platform: String,
    /// 패키지 이름 (모듈 패키지는 `stream::name`)
    pub package: String,
    /// 취약점 ID
    pub vulnerability_id: String,
    /// 수정 버전
    pub fixed_version: String,
    /// 데이터 출처
    #[serde(default)]
    pub data_source: Option<DataSource>,
    /// 배포판별 부가 메타데이터
    #[serde(default)]
    pub custom: Option<serde_json::Value>,
}

impl AdvisoryEntry {
    fn into_advisory(self) -> Advisory {
        Advisory {
            vulnerability_id: self.vulnerability_id,
            fixed_version: self.fixed_version,
            data_source: self.data_source,
            custom: self.custom,
        }
    }
}

/// 로컬 JSON 권고 DB
///
/// `(platform, package)` 쌍으로 인덱싱되어 조회는 O(1)입니다.
#[derive(Debug, Default)]
pub struct AdvisoryDb {
    index: HashMap<(String, String), Vec<Advisory>>,
    len: usize,
}

impl AdvisoryDb {
    /// 빈 DB를 생성합니다.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 엔트리 목록으로 DB를 생성합니다.
    pub fn from_entries(entries: Vec<AdvisoryEntry>) -> Self {
        let len = entries.len();
        let mut index: HashMap<(String, String), Vec<Advisory>> = HashMap::new();
        for entry in entries {
            let key = (entry.platform.clone(), entry.package.clone());
            index.entry(key).or_default().push(entry.into_advisory());
        }
        Self { index, len }
    }

    /// JSON 문자열(엔트리 배열)에서 DB를 파싱합니다.
    pub fn from_json(json: &str) -> Result<Self, DetectorError> {
        let entries: Vec<AdvisoryEntry> = serde_json::from_str(json).map_err(|e| {
            DetectorError::AdvisoryDbParse(format!("failed to parse advisory JSON: {e}"))
        })?;
        Ok(Self::from_entries(entries))
    }

    /// 디렉토리의 모든 `*.json` 파일을 파일 이름 순으로 로드합니다.
    ///
    /// # 보안 제한
    ///
    /// - 파일당 최대 50MB
    /// - 전체 엔트리 최대 1,000,000개 (초과분은 경고 후 버림)
    ///
    /// # Note
    ///
    /// 동기 I/O를 수행합니다. async 컨텍스트에서는 `tokio::task::spawn_blocking`으로
    /// 감싸세요.
    pub fn load_from_dir(dir: &Path) -> Result<Self, DetectorError> {
        let load_err = |path: &Path, reason: String| DetectorError::AdvisoryDbLoad {
            path: path.display().to_string(),
            reason,
        };

        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| load_err(dir, e.to_string()))?;
        for entry in entries {
            let path = entry.map_err(|e| load_err(dir, e.to_string()))?.path();
            if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut all_entries: Vec<AdvisoryEntry> = Vec::new();
        for path in &files {
            let size = std::fs::metadata(path)
                .map_err(|e| load_err(path, e.to_string()))?
                .len();
            if size > MAX_ADVISORY_FILE_SIZE {
                return Err(load_err(
                    path,
                    format!("file size {size} bytes exceeds maximum {MAX_ADVISORY_FILE_SIZE} bytes"),
                ));
            }

            let content =
                std::fs::read_to_string(path).map_err(|e| load_err(path, e.to_string()))?;
            let entries: Vec<AdvisoryEntry> = serde_json::from_str(&content).map_err(|e| {
                DetectorError::AdvisoryDbParse(format!("failed to parse {}: {e}", path.display()))
            })?;

            if all_entries.len() + entries.len() > MAX_ADVISORY_ENTRIES {
                warn!(
                    current = all_entries.len(),
                    new = entries.len(),
                    max = MAX_ADVISORY_ENTRIES,
                    "advisory database entry limit reached, truncating"
                );
                let remaining = MAX_ADVISORY_ENTRIES.saturating_sub(all_entries.len());
                all_entries.extend(entries.into_iter().take(remaining));
                break;
            }

            debug!(path = %path.display(), entries = entries.len(), "loaded advisory file");
            all_entries.extend(entries);
        }

        info!(
            dir = %dir.display(),
            files = files.len(),
            entries = all_entries.len(),
            "advisory database loaded"
        );
        Ok(Self::from_entries(all_entries))
    }

    /// 전체 엔트리 수
    pub fn len(&self) -> usize {
        self.len
    }

    /// 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AdvisorySource for AdvisoryDb {
    fn name(&self) -> &str {
        "advisory-db"
    }

    fn get(&self, platform: &str, pkg_name: &str) -> Result<Vec<Advisory>, DetectorError> {
        Ok(self
            .index
            .get(&(platform.to_owned(), pkg_name.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}
