#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`key`]: 스캔 설정 → 캐시 키 계산
//! - [`dirhash`]: 정책/데이터 디렉토리 내용 해시
//! - [`fs`]: 캐시 키별 블롭 저장소
//! - [`error`]: 에러 타입

pub mod dirhash;
pub mod error;
pub mod fs;
pub mod key;

pub use dirhash::hash_contents;
pub use error::CacheError;
pub use fs::FsCache;
pub use key::{
    AnalyzerVersions, ArtifactOption, MisconfScannerOption, SecretScannerOption, calc_key,
    is_valid_key,
};
