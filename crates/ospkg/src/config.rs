//! 탐지기 설정
//!
//! [`DetectorConfig`]는 core의 [`DetectorSection`](strata_core::config::DetectorSection)에서
//! 파생됩니다.
//!
//! # 사용 예시
//!
//! ```
//! use strata_ospkg::DetectorConfigBuilder;
//!
//! let config = DetectorConfigBuilder::new()
//!     .advisory_db_path("/tmp/advisory-db")
//!     .workers(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.effective_workers(), 4);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DetectorError;

/// 워커 수 상한
const MAX_WORKERS: usize = 1024;

/// 탐지기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// 권고 DB 디렉토리 경로
    pub advisory_db_path: String,
    /// 병렬 탐지 워커 수. 0이면 가용 병렬성
    pub workers: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            advisory_db_path: "/var/lib/strata/advisory-db".to_owned(),
            workers: 0,
        }
    }
}

impl DetectorConfig {
    /// core의 `DetectorSection`에서 탐지기 설정을 생성합니다.
    pub fn from_core(core: &strata_core::config::DetectorSection) -> Self {
        Self {
            advisory_db_path: core.advisory_db_path.clone(),
            workers: core.workers,
        }
    }

    /// 실제로 사용할 워커 수
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `advisory_db_path`: 비어있으면 안 됨
    /// - `workers`: 0-1024
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.advisory_db_path.trim().is_empty() {
            return Err(DetectorError::Config {
                field: "advisory_db_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.workers > MAX_WORKERS {
            return Err(DetectorError::Config {
                field: "workers".to_owned(),
                reason: format!("must be 0 (auto) or 1-{MAX_WORKERS}"),
            });
        }

        Ok(())
    }
}

/// 탐지기 설정 빌더
#[derive(Debug, Default)]
pub struct DetectorConfigBuilder {
    config: DetectorConfig,
}

impl DetectorConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 권고 DB 경로를 설정합니다.
    pub fn advisory_db_path(mut self, path: impl Into<String>) -> Self {
        self.config.advisory_db_path = path.into();
        self
    }

    /// 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<DetectorConfig, DetectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        DetectorConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_workers_uses_available_parallelism() {
        let config = DetectorConfig::default();
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn empty_db_path_rejected() {
        let err = DetectorConfigBuilder::new()
            .advisory_db_path("  ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("advisory_db_path"));
    }

    #[test]
    fn too_many_workers_rejected() {
        let err = DetectorConfigBuilder::new().workers(4096).build().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn from_core_copies_fields() {
        let core = strata_core::config::DetectorSection {
            advisory_db_path: "/srv/db".to_owned(),
            workers: 8,
        };
        let config = DetectorConfig::from_core(&core);
        assert_eq!(config.advisory_db_path, "/srv/db");
        assert_eq!(config.workers, 8);
    }
}
