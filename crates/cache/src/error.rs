//! 캐시 에러 타입
//!
//! 캐시 키 계산 실패는 모두 치명적입니다. 신뢰할 수 없는 키로 스캔을
//! 계속하면 잘못된 캐시 적중이 생길 수 있기 때문입니다.

use strata_core::error::{CacheKeyError, StrataError};

/// 캐시 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// 참조 파일/디렉토리 해시 실패
    #[error("failed to hash {path}: {source}")]
    Hash {
        /// 대상 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 선언된 시크릿 설정 파일이 없음
    #[error("secret config {path} was declared but does not exist")]
    SecretConfigMissing {
        /// 선언된 경로
        path: String,
    },

    /// 해시할 수 없는 파일 이름 (개행 포함 등)
    #[error("cannot hash file name {name:?}: {reason}")]
    InvalidName {
        /// 문제의 파일 이름
        name: String,
        /// 사유
        reason: String,
    },

    /// 키 입력 인코딩 실패
    #[error("encode failed: {0}")]
    Encode(String),

    /// 유효하지 않은 캐시 키 형식
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// 블롭 저장소 I/O 실패
    #[error("cache store error: {path}: {source}")]
    Store {
        /// 관련 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 블롭 직렬화/역직렬화 실패
    #[error("blob codec error: {key}: {reason}")]
    Codec {
        /// 캐시 키
        key: String,
        /// 실패 사유
        reason: String,
    },
}

impl From<CacheError> for StrataError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Hash { path, source } => StrataError::CacheKey(CacheKeyError::Hash {
                path,
                reason: source.to_string(),
            }),
            CacheError::SecretConfigMissing { path } => {
                StrataError::CacheKey(CacheKeyError::Hash {
                    path,
                    reason: "declared secret config does not exist".to_owned(),
                })
            }
            CacheError::InvalidName { name, reason } => {
                StrataError::CacheKey(CacheKeyError::Hash { path: name, reason })
            }
            CacheError::Encode(msg) => StrataError::CacheKey(CacheKeyError::Encode(msg)),
            CacheError::InvalidKey(key) => {
                StrataError::CacheKey(CacheKeyError::Store(format!("invalid cache key: {key}")))
            }
            CacheError::Store { path, source } => {
                StrataError::CacheKey(CacheKeyError::Store(format!("{path}: {source}")))
            }
            CacheError::Codec { key, reason } => {
                StrataError::CacheKey(CacheKeyError::Store(format!("{key}: {reason}")))
            }
        }
    }
}
