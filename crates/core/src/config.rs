//! 설정 관리: strata.toml 파싱 및 런타임 설정
//!
//! [`StrataConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//! 각 크레이트는 자기 섹션만 읽어 고유 설정(`WalkerConfig` 등)으로 변환합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STRATA_WALKER_SLOW=true` 형식)
//! 3. 설정 파일 (`strata.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), strata_core::error::StrataError> {
//! use strata_core::config::StrataConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = StrataConfig::load("strata.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = StrataConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StrataError};

/// 워커 수 상한
const MAX_WORKERS: usize = 1024;

/// strata 통합 설정
///
/// `strata.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 레이어 워커 설정
    #[serde(default)]
    pub walker: WalkerSection,
    /// 캐시 키 설정
    #[serde(default)]
    pub cache: CacheSection,
    /// OS 패키지 탐지 설정
    #[serde(default)]
    pub detector: DetectorSection,
}

impl StrataConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StrataError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StrataError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StrataError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StrataError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StrataError> {
        toml::from_str(toml_str).map_err(|e| {
            StrataError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STRATA_{SECTION}_{FIELD}`
    /// 예: `STRATA_WALKER_SKIP_DIRS=usr/share/doc,var/cache`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STRATA_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STRATA_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.cache_dir, "STRATA_GENERAL_CACHE_DIR");

        // Walker
        override_csv(&mut self.walker.skip_files, "STRATA_WALKER_SKIP_FILES");
        override_csv(&mut self.walker.skip_dirs, "STRATA_WALKER_SKIP_DIRS");
        override_bool(&mut self.walker.slow, "STRATA_WALKER_SLOW");
        override_bool(
            &mut self.walker.parallel_layers,
            "STRATA_WALKER_PARALLEL_LAYERS",
        );

        // Cache
        override_csv(&mut self.cache.file_patterns, "STRATA_CACHE_FILE_PATTERNS");
        override_csv(&mut self.cache.policy_paths, "STRATA_CACHE_POLICY_PATHS");
        override_csv(&mut self.cache.data_paths, "STRATA_CACHE_DATA_PATHS");
        override_opt_string(
            &mut self.cache.secret_config_path,
            "STRATA_CACHE_SECRET_CONFIG_PATH",
        );

        // Detector
        override_string(
            &mut self.detector.advisory_db_path,
            "STRATA_DETECTOR_ADVISORY_DB_PATH",
        );
        override_usize(&mut self.detector.workers, "STRATA_DETECTOR_WORKERS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StrataError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.general.cache_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "general.cache_dir".to_owned(),
                reason: "cache_dir must not be empty".to_owned(),
            }
            .into());
        }

        // 빈 패턴은 모든 경로와 매칭될 수 있으므로 거부
        for (field, patterns) in [
            ("walker.skip_files", &self.walker.skip_files),
            ("walker.skip_dirs", &self.walker.skip_dirs),
            ("cache.file_patterns", &self.cache.file_patterns),
            ("cache.policy_paths", &self.cache.policy_paths),
            ("cache.data_paths", &self.cache.data_paths),
        ] {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "entries must not be empty".to_owned(),
                }
                .into());
            }
        }

        if let Some(path) = &self.cache.secret_config_path
            && path.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "cache.secret_config_path".to_owned(),
                reason: "omit the field instead of setting an empty path".to_owned(),
            }
            .into());
        }

        if self.detector.advisory_db_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "detector.advisory_db_path".to_owned(),
                reason: "advisory_db_path must not be empty".to_owned(),
            }
            .into());
        }

        if self.detector.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                field: "detector.workers".to_owned(),
                reason: format!("must be 0 (auto) or 1-{MAX_WORKERS}"),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 분석 결과 캐시 디렉토리
    pub cache_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            cache_dir: "/var/cache/strata".to_owned(),
        }
    }
}

/// 레이어 워커 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerSection {
    /// 건너뛸 파일 glob 패턴
    pub skip_files: Vec<String>,
    /// 건너뛸 디렉토리 glob 패턴
    pub skip_dirs: Vec<String>,
    /// 저자원 모드 (작은 메모리 임계값 사용)
    pub slow: bool,
    /// 레이어 병렬 처리 여부
    pub parallel_layers: bool,
}

/// 캐시 키 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// 분석 대상 파일 패턴
    pub file_patterns: Vec<String>,
    /// 정책 파일/디렉토리 경로
    pub policy_paths: Vec<String>,
    /// 데이터 파일/디렉토리 경로
    pub data_paths: Vec<String>,
    /// 시크릿 스캐너 설정 파일 경로 (선언 시 반드시 존재해야 함)
    pub secret_config_path: Option<String>,
}

/// OS 패키지 탐지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSection {
    /// 권고 DB 디렉토리 경로
    pub advisory_db_path: String,
    /// 탐지 워커 수 (0이면 가용 병렬성)
    pub workers: usize,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            advisory_db_path: "/var/lib/strata/advisory-db".to_owned(),
            workers: 0,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.trim().is_empty() { None } else { Some(val) };
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
