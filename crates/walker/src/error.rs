//! 워커 에러 타입
//!
//! [`WalkerError`]는 레이어 순회 중 발생하는 모든 에러를 나타냅니다.
//! `From<WalkerError> for StrataError` 구현으로 `?` 연산자를 통해
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **아카이브 손상**: `Archive` (해당 레이어 순회 중단)
//! - **분석 콜백 실패**: `Analyze` (해당 레이어 순회 중단, 정리는 항상 수행)
//! - **취소**: `Cancelled`
//! - **레이어 열기**: `Open`
//! - **설정/패턴**: `Config`, `Pattern`
//! - **워커 태스크**: `Task`

use strata_core::error::{ConfigError, LayerError, StrataError};

/// 분석 콜백이 반환하는 에러
pub type AnalyzeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 레이어 워커 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum WalkerError {
    /// tar 스트림 읽기 실패 (손상된 아카이브)
    #[error("failed to extract layer {layer}: {source}")]
    Archive {
        /// 레이어 식별자
        layer: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 분석 콜백 실패
    #[error("failed to analyze {path}: {source}")]
    Analyze {
        /// 실패한 엔트리 경로
        path: String,
        /// 콜백이 반환한 에러
        source: AnalyzeError,
    },

    /// 취소 신호 수신
    #[error("walk cancelled in layer {layer}")]
    Cancelled {
        /// 레이어 식별자
        layer: String,
    },

    /// 레이어 파일 열기 실패
    #[error("failed to open layer {path}: {source}")]
    Open {
        /// 레이어 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// glob 패턴 컴파일 실패
    #[error("invalid skip pattern '{pattern}': {reason}")]
    Pattern {
        /// 문제의 패턴
        pattern: String,
        /// 실패 사유
        reason: String,
    },

    /// blocking 워커 태스크 실패
    #[error("layer task failed: {0}")]
    Task(String),
}

impl From<WalkerError> for StrataError {
    fn from(err: WalkerError) -> Self {
        match err {
            WalkerError::Archive { layer, source } => StrataError::Layer(LayerError::Corrupt {
                layer,
                reason: source.to_string(),
            }),
            WalkerError::Analyze { path, source } => StrataError::Layer(LayerError::Analysis {
                path,
                reason: source.to_string(),
            }),
            WalkerError::Cancelled { layer } => StrataError::Layer(LayerError::Cancelled { layer }),
            WalkerError::Open { source, .. } => StrataError::Io(source),
            WalkerError::Config { field, reason } => {
                StrataError::Config(ConfigError::InvalidValue { field, reason })
            }
            WalkerError::Pattern { pattern, reason } => {
                StrataError::Config(ConfigError::InvalidValue {
                    field: "walker.skip_patterns".to_owned(),
                    reason: format!("'{pattern}': {reason}"),
                })
            }
            WalkerError::Task(msg) => StrataError::Layer(LayerError::Worker(msg)),
        }
    }
}
