//! 패키지 버전 비교
//!
//! 생태계마다 버전 문자열의 전순서가 다릅니다. [`VersionComparator`]는 두 버전
//! 문자열을 비교하고, 파싱할 수 없으면 [`VersionError`]를 반환합니다.
//! 스캐너는 이 에러를 "취약하지 않음"으로 취급하지 않고 비교 자체를 건너뜁니다.

pub mod deb;
pub mod rpm;

use std::cmp::Ordering;

pub use deb::{DebComparator, DebVersion};
pub use rpm::{RpmComparator, RpmVersion};

/// 버전 문자열 파싱 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("version parse error: '{version}': {reason}")]
pub struct VersionError {
    /// 파싱 대상 버전 문자열
    pub version: String,
    /// 실패 사유
    pub reason: String,
}

impl VersionError {
    pub(crate) fn new(version: &str, reason: impl Into<String>) -> Self {
        Self {
            version: version.to_owned(),
            reason: reason.into(),
        }
    }
}

/// 버전 비교기
pub trait VersionComparator: Send + Sync {
    /// 비교기 이름 (로그용)
    fn name(&self) -> &'static str;

    /// `a`와 `b`를 비교합니다.
    ///
    /// # Errors
    ///
    /// 어느 한 쪽이라도 파싱할 수 없으면 `VersionError`
    fn compare(&self, a: &str, b: &str) -> Result<Ordering, VersionError>;

    /// `installed`가 `fixed`보다 엄격히 작으면 `true`
    fn is_vulnerable(&self, installed: &str, fixed: &str) -> Result<bool, VersionError> {
        Ok(self.compare(installed, fixed)? == Ordering::Less)
    }
}

/// `epoch:` 접두어를 분리합니다. 접두어가 없으면 에포크 0.
pub(crate) fn split_epoch(s: &str) -> Result<(u64, &str), VersionError> {
    match s.split_once(':') {
        Some((epoch, rest)) => {
            let epoch = epoch
                .parse::<u64>()
                .map_err(|_| VersionError::new(s, format!("epoch '{epoch}' is not a number")))?;
            Ok((epoch, rest))
        }
        None => Ok((0, s)),
    }
}
