//! AlmaLinux 스캐너
//!
//! - 배포판 버전은 첫 `.` 앞의 주 버전만 사용 (`8.5` → `8`)
//! - 벤더가 `Fedora Project`인 패키지는 같은 주 버전의 EPEL 권고로 조회
//! - 모듈 패키지 이름은 모듈 레이블의 스트림으로 재작성 (`nodejs:12::npm`)
//! - EPEL이 아닌 패키지 중 릴리스에 `.module_el`이 있는 것은 정확히 분류할 수
//!   없으므로 건너뛰고 `skipped_packages`에 모음
//! - 버전 비교는 RPM 규칙

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use tracing::debug;

use strata_core::clock::Clock;
use strata_core::metrics as m;
use strata_core::types::{OsFamily, Package};

use super::{Detection, EPEL_VENDOR, OsScanner, match_advisories, source_error, supported_at};
use crate::advisory::{AdvisorySource, alma_platform, epel_platform};
use crate::error::DetectorError;
use crate::version::RpmComparator;

/// 릴리스에 이 표식이 있으면 모듈 패키지
const MODULAR_RELEASE_MARKER: &str = ".module_el";

/// AlmaLinux 스캐너
pub struct AlmaScanner {
    advisories: Arc<dyn AdvisorySource>,
    epel: Arc<dyn AdvisorySource>,
    clock: Arc<dyn Clock>,
}

impl AlmaScanner {
    /// 배포판 권고 소스, EPEL 권고 소스, 시계로 스캐너를 생성합니다.
    pub fn new(
        advisories: Arc<dyn AdvisorySource>,
        epel: Arc<dyn AdvisorySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            advisories,
            epel,
            clock,
        }
    }
}

impl OsScanner for AlmaScanner {
    fn family(&self) -> OsFamily {
        OsFamily::Alma
    }

    fn detect(&self, os_version: &str, packages: &[Package]) -> Result<Detection, DetectorError> {
        let os_ver = major_version(os_version);
        debug!(
            family = "alma",
            os_version = os_ver,
            packages = packages.len(),
            "detecting vulnerabilities"
        );
        counter!(m::OSPKG_PACKAGES_SCANNED_TOTAL, m::LABEL_FAMILY => "alma")
            .increment(packages.len() as u64);

        let mut detection = Detection::default();
        for pkg in packages {
            let pkg_name = add_modular_namespace(&pkg.name, &pkg.modularity_label);

            let (source, platform) = if pkg.vendor == EPEL_VENDOR {
                (&self.epel, epel_platform(os_ver))
            } else {
                if pkg.release.contains(MODULAR_RELEASE_MARKER) {
                    detection.skipped_packages.push(pkg.name.clone());
                    continue;
                }
                (&self.advisories, alma_platform(os_ver))
            };

            let advisories = source
                .get(&platform, &pkg_name)
                .map_err(|e| source_error(source.name(), e))?;
            if advisories.is_empty() {
                continue;
            }

            let installed = pkg.format_version();
            detection.findings.extend(match_advisories(
                OsFamily::Alma,
                &RpmComparator,
                pkg,
                &installed,
                advisories,
            ));
        }

        Ok(detection)
    }

    fn is_supported_version(&self, os_version: &str) -> bool {
        let os_ver = major_version(os_version);
        supported_at(self.clock.as_ref(), OsFamily::Alma, os_ver, eol_date(os_ver))
    }
}

/// 첫 `.` 앞의 주 버전
pub fn major_version(os_version: &str) -> &str {
    os_version
        .split_once('.')
        .map_or(os_version, |(major, _)| major)
}

/// 모듈 레이블 `name:stream:version:context`의 두 번째 `:` 앞까지를 네임스페이스로
/// 붙입니다. `:`가 둘 미만이면 이름을 그대로 반환합니다.
pub fn add_modular_namespace(name: &str, label: &str) -> String {
    match label.match_indices(':').nth(1) {
        Some((idx, _)) => format!("{}::{name}", &label[..idx]),
        None => name.to_owned(),
    }
}

fn eol_date(major: &str) -> Option<DateTime<Utc>> {
    match major {
        "8" => Utc.with_ymd_and_hms(2029, 12, 31, 23, 59, 59).single(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_version_normalization() {
        assert_eq!(major_version("8.5"), "8");
        assert_eq!(major_version("8.5.2111"), "8");
        assert_eq!(major_version("8"), "8");
        assert_eq!(major_version(""), "");
    }

    #[test]
    fn modular_namespace() {
        assert_eq!(
            add_modular_namespace("npm", "nodejs:12:8030020201124152102:229f0a1c"),
            "nodejs:12::npm"
        );
        assert_eq!(add_modular_namespace("npm", "nodejs:12"), "npm");
        assert_eq!(add_modular_namespace("npm", ""), "npm");
        assert_eq!(add_modular_namespace("php", "php:7.4:"), "php:7.4::php");
    }

    #[test]
    fn eol_table() {
        assert!(eol_date("8").is_some());
        assert!(eol_date("9").is_none());
    }
}
