//! OS 패키지 탐지 에러 타입
//!
//! [`DetectorError`]는 탐지 호출 하나를 실패시키는 에러입니다.
//! 버전 파싱 실패는 여기에 포함되지 않습니다. 비교기가
//! [`VersionError`](crate::version::VersionError)를 돌려주면 스캐너가 로그만 남기고
//! 해당 비교를 건너뜁니다.

use strata_core::error::{ConfigError, DetectError, StrataError};

/// 탐지 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// 권고 소스 조회 실패
    #[error("advisory source {source_name} failed: {reason}")]
    AdvisorySource {
        /// 소스 이름
        source_name: String,
        /// 실패 사유
        reason: String,
    },

    /// 권고 DB 로딩 실패
    #[error("advisory db load error: {path}: {reason}")]
    AdvisoryDbLoad {
        /// DB 파일/디렉토리 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 권고 DB 파싱 실패
    #[error("advisory db parse error: {0}")]
    AdvisoryDbParse(String),

    /// 등록되지 않은 배포판 계열
    #[error("unsupported os family: {0}")]
    UnsupportedFamily(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 워커 태스크 실패
    #[error("task error: {0}")]
    Task(String),
}

impl From<DetectorError> for StrataError {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::AdvisorySource {
                source_name,
                reason,
            } => StrataError::Detect(DetectError::AdvisorySource(format!(
                "{source_name}: {reason}"
            ))),
            DetectorError::AdvisoryDbLoad { path, reason } => {
                StrataError::Detect(DetectError::AdvisoryDb(format!("{path}: {reason}")))
            }
            DetectorError::AdvisoryDbParse(msg) => {
                StrataError::Detect(DetectError::AdvisoryDb(msg))
            }
            DetectorError::UnsupportedFamily(family) => {
                StrataError::Detect(DetectError::UnsupportedFamily(family))
            }
            DetectorError::Config { field, reason } => {
                StrataError::Config(ConfigError::InvalidValue { field, reason })
            }
            DetectorError::Task(msg) => StrataError::Detect(DetectError::Worker(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_source_display() {
        let err = DetectorError::AdvisorySource {
            source_name: "advisory-db".to_owned(),
            reason: "bucket unreadable".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "advisory source advisory-db failed: bucket unreadable"
        );
    }

    #[test]
    fn unsupported_family_converts() {
        let strata: StrataError = DetectorError::UnsupportedFamily("debian".to_owned()).into();
        assert!(matches!(
            strata,
            StrataError::Detect(DetectError::UnsupportedFamily(ref f)) if f == "debian"
        ));
    }

    #[test]
    fn config_error_converts_to_config() {
        let err = DetectorError::Config {
            field: "workers".to_owned(),
            reason: "too many".to_owned(),
        };
        let strata: StrataError = err.into();
        assert!(matches!(
            strata,
            StrataError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn task_error_converts_to_worker() {
        let strata: StrataError = DetectorError::Task("join".to_owned()).into();
        assert!(matches!(strata, StrataError::Detect(DetectError::Worker(_))));
    }
}
