#![doc = include_str!("../README.md")]

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{CacheKeyError, ConfigError, DetectError, LayerError, StrataError};

// 설정
pub use config::StrataConfig;

// 시계
pub use clock::{Clock, FixedClock, SystemClock};

// 도메인 타입
pub use types::{
    Advisory, DataSource, DetectedVulnerability, LayerInfo, OsFamily, Package, format_version,
};
