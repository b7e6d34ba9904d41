//! 캐시 키 계산
//!
//! [`calc_key`]는 스캔 설정을 하나의 지문으로 요약합니다.
//!
//! # 계산 순서
//!
//! 1. 모든 목록 옵션 정렬 (입력 순서가 키에 영향을 주지 않도록)
//! 2. `{ID, AnalyzerVersions, HookVersions, SkipFiles, SkipDirs, FilePatterns}`를
//!    JSON으로 인코딩해 SHA-256에 입력
//! 3. 정책 경로, 데이터 경로 순으로 각 경로의 내용 해시를 입력. 비어 있지 않은
//!    그룹은 앞에 `<그룹 이름>\n<경로 수>\n`을 먼저 입력해 그룹 간 이동도 키를 바꿈
//! 4. 시크릿 설정 경로가 선언되어 있으면 그 내용 해시를 입력 (없으면 에러)
//! 5. `sha256:<hex>` 반환

use std::collections::BTreeMap;
use std::path::PathBuf;

use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use strata_core::metrics as m;

use crate::dirhash::hash_contents;
use crate::error::CacheError;

/// 캐시 키 접두어
pub const KEY_PREFIX: &str = "sha256:";

/// 분석기 버전
///
/// 분석기 구현이 바뀌면 버전을 올려 이전 캐시를 무효화합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzerVersions {
    /// 분석기 종류 → 버전
    pub analyzers: BTreeMap<String, u32>,
    /// 후처리 분석기 종류 → 버전
    pub post_analyzers: BTreeMap<String, u32>,
}

/// 오설정 스캐너 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MisconfScannerOption {
    /// 정책 파일/디렉토리
    pub policy_paths: Vec<PathBuf>,
    /// 데이터 파일/디렉토리
    pub data_paths: Vec<PathBuf>,
}

impl MisconfScannerOption {
    fn sort(&mut self) {
        self.policy_paths.sort();
        self.data_paths.sort();
    }
}

/// 시크릿 스캐너 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretScannerOption {
    /// 설정 파일 경로. `None`이면 선언하지 않은 것
    pub config_path: Option<PathBuf>,
}

/// 아티팩트 분석 옵션 중 캐시 키에 영향을 주는 부분
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactOption {
    /// 건너뛸 파일 패턴
    pub skip_files: Vec<String>,
    /// 건너뛸 디렉토리 패턴
    pub skip_dirs: Vec<String>,
    /// 분석 대상 파일 패턴
    pub file_patterns: Vec<String>,
    /// 오설정 스캐너 옵션
    pub misconf: MisconfScannerOption,
    /// 시크릿 스캐너 옵션
    pub secret: SecretScannerOption,
}

impl ArtifactOption {
    /// core 설정의 walker/cache 섹션에서 옵션을 생성합니다.
    pub fn from_core(
        walker: &strata_core::config::WalkerSection,
        cache: &strata_core::config::CacheSection,
    ) -> Self {
        Self {
            skip_files: walker.skip_files.clone(),
            skip_dirs: walker.skip_dirs.clone(),
            file_patterns: cache.file_patterns.clone(),
            misconf: MisconfScannerOption {
                policy_paths: cache.policy_paths.iter().map(PathBuf::from).collect(),
                data_paths: cache.data_paths.iter().map(PathBuf::from).collect(),
            },
            secret: SecretScannerOption {
                config_path: cache.secret_config_path.as_ref().map(PathBuf::from),
            },
        }
    }

    /// 모든 목록 옵션을 정렬합니다.
    pub fn sort(&mut self) {
        self.skip_files.sort();
        self.skip_dirs.sort();
        self.file_patterns.sort();
        self.misconf.sort();
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeyBase<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    analyzer_versions: &'a AnalyzerVersions,
    hook_versions: &'a BTreeMap<String, u32>,
    skip_files: &'a [String],
    skip_dirs: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    file_patterns: &'a [String],
}

fn is_empty(list: &&[String]) -> bool {
    list.is_empty()
}

/// 스캔 설정과 참조 파일 내용으로 캐시 키를 계산합니다.
///
/// # Errors
///
/// - 정책/데이터 경로 해시 실패: `CacheError::Hash`
/// - 선언된 시크릿 설정 파일 없음: `CacheError::SecretConfigMissing`
/// - 인코딩 실패: `CacheError::Encode`
pub fn calc_key(
    id: &str,
    analyzer_versions: &AnalyzerVersions,
    hook_versions: &BTreeMap<String, u32>,
    option: &ArtifactOption,
) -> Result<String, CacheError> {
    let mut option = option.clone();
    option.sort();

    let mut hasher = Sha256::new();

    let base = KeyBase {
        id,
        analyzer_versions,
        hook_versions,
        skip_files: &option.skip_files,
        skip_dirs: &option.skip_dirs,
        file_patterns: &option.file_patterns,
    };
    let mut encoded =
        serde_json::to_vec(&base).map_err(|e| CacheError::Encode(format!("key base: {e}")))?;
    encoded.push(b'\n');
    hasher.update(&encoded);

    for (group, paths) in [
        ("policy", &option.misconf.policy_paths),
        ("data", &option.misconf.data_paths),
    ] {
        if paths.is_empty() {
            continue;
        }
        hasher.update(format!("{group}\n{}\n", paths.len()).as_bytes());
        for path in paths {
            let hash = hash_contents(path)?;
            debug!(group, path = %path.display(), hash = %hash, "hashed referenced path");
            hasher.update(hash.as_bytes());
        }
    }

    if let Some(path) = &option.secret.config_path {
        let hash = hash_contents(path).map_err(|e| match e {
            CacheError::Hash { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                CacheError::SecretConfigMissing {
                    path: path.display().to_string(),
                }
            }
            other => other,
        })?;
        hasher.update(hash.as_bytes());
    }

    counter!(m::CACHE_KEYS_CALCULATED_TOTAL).increment(1);
    Ok(format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize())))
}

/// `sha256:<64 lowercase hex>` 형식인지 확인합니다.
pub fn is_valid_key(key: &str) -> bool {
    key.strip_prefix(KEY_PREFIX).is_some_and(|digest| {
        digest.len() == 64
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions() -> AnalyzerVersions {
        AnalyzerVersions {
            analyzers: BTreeMap::from([("rpm".to_owned(), 1), ("os-release".to_owned(), 1)]),
            post_analyzers: BTreeMap::new(),
        }
    }

    fn key(option: &ArtifactOption) -> String {
        calc_key("sha256:image", &versions(), &BTreeMap::new(), option).unwrap()
    }

    #[test]
    fn key_has_expected_format() {
        let k = key(&ArtifactOption::default());
        assert!(is_valid_key(&k), "{k}");
    }

    #[test]
    fn key_base_encoding_uses_stable_field_names() {
        let option = ArtifactOption::default();
        let hooks = BTreeMap::new();
        let base = KeyBase {
            id: "x",
            analyzer_versions: &AnalyzerVersions::default(),
            hook_versions: &hooks,
            skip_files: &option.skip_files,
            skip_dirs: &option.skip_dirs,
            file_patterns: &option.file_patterns,
        };
        let json = serde_json::to_string(&base).unwrap();
        assert_eq!(
            json,
            r#"{"ID":"x","AnalyzerVersions":{"Analyzers":{},"PostAnalyzers":{}},"HookVersions":{},"SkipFiles":[],"SkipDirs":[]}"#
        );
    }

    #[test]
    fn is_valid_key_rejects_malformed() {
        assert!(!is_valid_key("sha256:ABC"));
        assert!(!is_valid_key("md5:0123"));
        assert!(!is_valid_key(&format!("sha256:{}", "g".repeat(64))));
        assert!(is_valid_key(&format!("sha256:{}", "0a".repeat(32))));
    }

    #[test]
    fn from_core_maps_sections() {
        let walker = strata_core::config::WalkerSection {
            skip_files: vec!["f".to_owned()],
            skip_dirs: vec!["d".to_owned()],
            ..Default::default()
        };
        let cache = strata_core::config::CacheSection {
            file_patterns: vec!["p".to_owned()],
            policy_paths: vec!["/pol".to_owned()],
            data_paths: vec!["/data".to_owned()],
            secret_config_path: Some("/secret.yaml".to_owned()),
        };
        let option = ArtifactOption::from_core(&walker, &cache);
        assert_eq!(option.skip_files, vec!["f"]);
        assert_eq!(option.skip_dirs, vec!["d"]);
        assert_eq!(option.file_patterns, vec!["p"]);
        assert_eq!(option.misconf.policy_paths, vec![PathBuf::from("/pol")]);
        assert_eq!(option.misconf.data_paths, vec![PathBuf::from("/data")]);
        assert_eq!(
            option.secret.config_path,
            Some(PathBuf::from("/secret.yaml"))
        );
    }
}
