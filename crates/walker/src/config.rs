//! 워커 설정
//!
//! [`WalkerConfig`]는 core의 [`WalkerSection`](strata_core::config::WalkerSection)에
//! 메모리 임계값 재정의 같은 워커 고유 설정을 더합니다.
//!
//! # 사용 예시
//!
//! ```
//! use strata_walker::WalkerConfigBuilder;
//!
//! let config = WalkerConfigBuilder::new()
//!     .skip_dirs(vec!["usr/share/doc".to_owned()])
//!     .slow(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.size_threshold(), 100 * 1024);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::WalkerError;

/// 기본 메모리 임계값 (200 MiB)
pub const DEFAULT_SIZE_THRESHOLD: u64 = 200 << 20;

/// 저자원 모드 메모리 임계값 (100 KiB)
pub const SLOW_SIZE_THRESHOLD: u64 = 100 << 10;

/// 레이어 워커 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// 건너뛸 파일 glob 패턴
    pub skip_files: Vec<String>,
    /// 건너뛸 디렉토리 glob 패턴
    pub skip_dirs: Vec<String>,
    /// 저자원 모드
    pub slow: bool,
    /// 레이어 병렬 순회 여부
    pub parallel_layers: bool,

    // --- 모듈 고유 확장 ---
    /// 메모리 임계값 재정의 (바이트). `None`이면 프리셋 사용
    pub memory_threshold: Option<u64>,
}

impl WalkerConfig {
    /// core의 `WalkerSection`에서 워커 설정을 생성합니다.
    pub fn from_core(core: &strata_core::config::WalkerSection) -> Self {
        Self {
            skip_files: core.skip_files.clone(),
            skip_dirs: core.skip_dirs.clone(),
            slow: core.slow,
            parallel_layers: core.parallel_layers,
            ..Self::default()
        }
    }

    /// 이 설정에서 메모리에 보관할 최대 엔트리 크기
    pub fn size_threshold(&self) -> u64 {
        match self.memory_threshold {
            Some(threshold) => threshold,
            None if self.slow => SLOW_SIZE_THRESHOLD,
            None => DEFAULT_SIZE_THRESHOLD,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `memory_threshold`: 지정 시 0 불가
    /// - `skip_files`, `skip_dirs`: 빈 패턴 불가
    pub fn validate(&self) -> Result<(), WalkerError> {
        if self.memory_threshold == Some(0) {
            return Err(WalkerError::Config {
                field: "memory_threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        for (field, patterns) in [("skip_files", &self.skip_files), ("skip_dirs", &self.skip_dirs)]
        {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(WalkerError::Config {
                    field: field.to_owned(),
                    reason: "patterns must not be empty".to_owned(),
                });
            }
        }

        Ok(())
    }
}

/// [`WalkerConfig`] 빌더
#[derive(Default)]
pub struct WalkerConfigBuilder {
    config: WalkerConfig,
}

impl WalkerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 건너뛸 파일 패턴을 설정합니다.
    pub fn skip_files(mut self, patterns: Vec<String>) -> Self {
        self.config.skip_files = patterns;
        self
    }

    /// 건너뛸 디렉토리 패턴을 설정합니다.
    pub fn skip_dirs(mut self, patterns: Vec<String>) -> Self {
        self.config.skip_dirs = patterns;
        self
    }

    /// 저자원 모드를 설정합니다.
    pub fn slow(mut self, slow: bool) -> Self {
        self.config.slow = slow;
        self
    }

    /// 레이어 병렬 순회 여부를 설정합니다.
    pub fn parallel_layers(mut self, parallel: bool) -> Self {
        self.config.parallel_layers = parallel;
        self
    }

    /// 메모리 임계값을 직접 지정합니다.
    pub fn memory_threshold(mut self, bytes: u64) -> Self {
        self.config.memory_threshold = Some(bytes);
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `WalkerError::Config` 반환
    pub fn build(self) -> Result<WalkerConfig, WalkerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        WalkerConfig::default().validate().unwrap();
    }

    #[test]
    fn threshold_presets() {
        let fast = WalkerConfig::default();
        assert_eq!(fast.size_threshold(), DEFAULT_SIZE_THRESHOLD);

        let slow = WalkerConfig {
            slow: true,
            ..Default::default()
        };
        assert_eq!(slow.size_threshold(), SLOW_SIZE_THRESHOLD);
    }

    #[test]
    fn explicit_threshold_wins_over_preset() {
        let config = WalkerConfig {
            slow: true,
            memory_threshold: Some(16),
            ..Default::default()
        };
        assert_eq!(config.size_threshold(), 16);
    }

    #[test]
    fn from_core_preserves_values() {
        let core = strata_core::config::WalkerSection {
            skip_files: vec!["**/*.pyc".to_owned()],
            skip_dirs: vec!["usr/share/doc".to_owned()],
            slow: true,
            parallel_layers: true,
        };
        let config = WalkerConfig::from_core(&core);
        assert_eq!(config.skip_files, vec!["**/*.pyc"]);
        assert_eq!(config.skip_dirs, vec!["usr/share/doc"]);
        assert!(config.slow);
        assert!(config.parallel_layers);
        assert!(config.memory_threshold.is_none());
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let config = WalkerConfig {
            memory_threshold: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_pattern() {
        let config = WalkerConfig {
            skip_files: vec!["  ".to_owned()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("skip_files"));
    }

    #[test]
    fn builder_all_setters() {
        let config = WalkerConfigBuilder::new()
            .skip_files(vec!["a".to_owned()])
            .skip_dirs(vec!["b".to_owned()])
            .slow(true)
            .parallel_layers(true)
            .memory_threshold(1024)
            .build()
            .unwrap();
        assert_eq!(config.skip_files, vec!["a"]);
        assert_eq!(config.skip_dirs, vec!["b"]);
        assert!(config.slow);
        assert!(config.parallel_layers);
        assert_eq!(config.size_threshold(), 1024);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = WalkerConfigBuilder::new().memory_threshold(0).build();
        assert!(result.is_err());
    }
}
