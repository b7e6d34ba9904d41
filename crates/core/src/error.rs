//! 에러 타입: 도메인별 에러 정의

/// strata 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StrataError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 레이어 처리 에러
    #[error("layer error: {0}")]
    Layer(#[from] LayerError),

    /// 캐시 키 계산 에러
    #[error("cache key error: {0}")]
    CacheKey(#[from] CacheKeyError),

    /// 취약점 탐지 에러
    #[error("detect error: {0}")]
    Detect(#[from] DetectError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 레이어 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// 손상된 아카이브
    #[error("corrupt archive in layer {layer}: {reason}")]
    Corrupt { layer: String, reason: String },

    /// 분석 콜백 실패
    #[error("analysis failed for {path}: {reason}")]
    Analysis { path: String, reason: String },

    /// 취소됨
    #[error("walk cancelled in layer {layer}")]
    Cancelled { layer: String },

    /// 워커 태스크 실패
    #[error("layer worker failed: {0}")]
    Worker(String),
}

/// 캐시 키 계산 에러
#[derive(Debug, thiserror::Error)]
pub enum CacheKeyError {
    /// 참조 파일 해시 실패
    #[error("failed to hash {path}: {reason}")]
    Hash { path: String, reason: String },

    /// 인코딩 실패
    #[error("encode failed: {0}")]
    Encode(String),

    /// 캐시 저장소 에러
    #[error("cache store error: {0}")]
    Store(String),
}

/// 취약점 탐지 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// 권고 소스 조회 실패
    #[error("advisory source failed: {0}")]
    AdvisorySource(String),

    /// 지원하지 않는 배포판 계열
    #[error("unsupported os family: {0}")]
    UnsupportedFamily(String),

    /// 권고 DB 로딩 실패
    #[error("advisory db error: {0}")]
    AdvisoryDb(String),

    /// 워커 태스크 실패
    #[error("detection worker failed: {0}")]
    Worker(String),
}
