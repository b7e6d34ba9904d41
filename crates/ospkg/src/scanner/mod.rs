//! 배포판별 OS 패키지 스캐너
//!
//! 모든 배포판 스캐너는 [`OsScanner`] 계약을 따릅니다.
//!
//! # 패키지 하나의 탐지 흐름
//!
//! ```text
//! Start
//!   ├─ 서드파티 저장소 패키지 → 보조 소스 (예: EPEL)
//!   ├─ 일반 패키지           → 배포판 소스
//!   └─ 분류 불가             → skipped_packages
//!        │
//!   QueryAdvisories
//!   ├─ 권고 없음 → 종료
//!   └─ 권고마다 CompareVersions
//!        ├─ installed < fixed → 탐지 결과 생성
//!        ├─ 같거나 큼         → 무시
//!        └─ 파싱 실패         → debug 로그 후 무시
//! ```

pub mod alma;
pub mod amazon;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, warn};

use strata_core::clock::Clock;
use strata_core::metrics as m;
use strata_core::types::{Advisory, DetectedVulnerability, OsFamily, Package};

use crate::error::DetectorError;
use crate::version::VersionComparator;

pub use alma::AlmaScanner;
pub use amazon::AmazonScanner;

/// 서드파티(EPEL) 패키지의 벤더 태그
pub const EPEL_VENDOR: &str = "Fedora Project";

/// 탐지 호출 하나의 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// 탐지된 취약점
    pub findings: Vec<DetectedVulnerability>,
    /// 분류할 수 없어 건너뛴 패키지 이름
    pub skipped_packages: Vec<String>,
}

impl Detection {
    /// 다른 결과를 뒤에 이어붙입니다.
    pub fn extend(&mut self, other: Detection) {
        self.findings.extend(other.findings);
        self.skipped_packages.extend(other.skipped_packages);
    }
}

/// 배포판 계열 스캐너
///
/// 구현체는 배포판 계열 식별자와 주입된 시계 외에 호출 간 상태를 갖지 않습니다.
pub trait OsScanner: Send + Sync {
    /// 배포판 계열
    fn family(&self) -> OsFamily;

    /// 설치된 패키지 목록에서 취약점을 탐지합니다.
    ///
    /// # Errors
    ///
    /// 권고 소스 조회 실패 시 `DetectorError::AdvisorySource`.
    /// 버전 파싱 실패는 에러가 아닙니다.
    fn detect(&self, os_version: &str, packages: &[Package]) -> Result<Detection, DetectorError>;

    /// 주입된 시계 기준으로 해당 버전이 아직 지원되는지 반환합니다.
    ///
    /// EOL 표에 없는 버전은 경고 로그와 함께 `false`입니다.
    fn is_supported_version(&self, os_version: &str) -> bool;
}

/// EOL 표 조회 결과로 지원 여부를 판정합니다.
pub(crate) fn supported_at(
    clock: &dyn Clock,
    family: OsFamily,
    os_version: &str,
    eol: Option<DateTime<Utc>>,
) -> bool {
    match eol {
        Some(eol) => clock.now() < eol,
        None => {
            warn!(family = %family, os_version, "this OS version is not on the EOL list");
            false
        }
    }
}

/// 한 패키지의 권고 목록을 설치 버전과 비교해 탐지 결과를 만듭니다.
///
/// `installed`는 패키지 레코드에서 렌더링한 원래 버전 문자열이며 결과에 그대로
/// 실립니다. 수정 버전도 권고에 선언된 문자열을 그대로 씁니다.
pub(crate) fn match_advisories(
    family: OsFamily,
    comparator: &dyn VersionComparator,
    pkg: &Package,
    installed: &str,
    advisories: Vec<Advisory>,
) -> Vec<DetectedVulnerability> {
    let family_label = family.to_string();
    let mut findings = Vec::new();

    for adv in advisories {
        match comparator.is_vulnerable(installed, &adv.fixed_version) {
            Ok(true) => {
                findings.push(DetectedVulnerability {
                    vulnerability_id: adv.vulnerability_id,
                    pkg_name: pkg.name.clone(),
                    installed_version: installed.to_owned(),
                    fixed_version: adv.fixed_version,
                    layer: pkg.layer.clone(),
                    data_source: adv.data_source,
                    custom: adv.custom,
                });
            }
            Ok(false) => {}
            Err(e) => {
                counter!(m::OSPKG_VERSION_ERRORS_TOTAL, m::LABEL_FAMILY => family_label.clone())
                    .increment(1);
                debug!(
                    family = %family,
                    comparator = comparator.name(),
                    package = %pkg.name,
                    installed,
                    fixed = %adv.fixed_version,
                    vulnerability = %adv.vulnerability_id,
                    error = %e,
                    "failed to compare versions, skipping advisory"
                );
            }
        }
    }

    if !findings.is_empty() {
        counter!(m::OSPKG_VULNS_DETECTED_TOTAL, m::LABEL_FAMILY => family_label)
            .increment(findings.len() as u64);
    }
    findings
}

/// 권고 소스 조회 결과에 소스 이름을 붙여 에러로 변환합니다.
pub(crate) fn source_error(source_name: &str, err: DetectorError) -> DetectorError {
    match err {
        DetectorError::AdvisorySource { .. } => err,
        other => DetectorError::AdvisorySource {
            source_name: source_name.to_owned(),
            reason: other.to_string(),
        },
    }
}
