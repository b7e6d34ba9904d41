#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`version`]: RPM / Debian 버전 비교기
//! - [`advisory`]: 권고 소스 trait과 로컬 JSON 권고 DB
//! - [`scanner`]: 배포판별 스캐너 (AlmaLinux, Amazon Linux)
//! - [`registry`]: 배포판 계열 → 스캐너, 병렬 탐지
//! - [`config`]: 탐지기 설정
//! - [`error`]: 에러 타입

pub mod advisory;
pub mod config;
pub mod error;
pub mod registry;
pub mod scanner;
pub mod version;

pub use advisory::{AdvisoryDb, AdvisoryEntry, AdvisorySource};
pub use config::{DetectorConfig, DetectorConfigBuilder};
pub use error::DetectorError;
pub use registry::{DetectionReport, DetectorRegistry};
pub use scanner::{AlmaScanner, AmazonScanner, Detection, OsScanner};
pub use version::{DebComparator, RpmComparator, VersionComparator, VersionError};
