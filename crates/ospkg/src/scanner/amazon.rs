//! Amazon Linux 스캐너
//!
//! - 배포판 버전은 공백 기준 첫 필드이며 `2`가 아니면 모두 `1`
//! - 벤더가 `Fedora Project`인 패키지는 EPEL 권고로 조회 (`1` → EPEL 6, `2` → EPEL 7).
//!   EPEL 6 권고는 지원하지 않으므로 해당 패키지는 건너뜀
//! - 버전 비교는 Debian 규칙
//! - 렌더링한 설치 버전이 비어 있거나 파싱할 수 없으면 패키지를 건너뜀

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use tracing::debug;

use strata_core::clock::Clock;
use strata_core::metrics as m;
use strata_core::types::{OsFamily, Package};

use super::{Detection, EPEL_VENDOR, OsScanner, match_advisories, source_error, supported_at};
use crate::advisory::{AdvisorySource, amazon_platform, epel_platform};
use crate::error::DetectorError;
use crate::version::{DebComparator, DebVersion};

/// 지원하지 않는 EPEL 버전
const UNSUPPORTED_EPEL: &str = "6";

/// Amazon Linux 스캐너
pub struct AmazonScanner {
    advisories: Arc<dyn AdvisorySource>,
    epel: Arc<dyn AdvisorySource>,
    clock: Arc<dyn Clock>,
}

impl AmazonScanner {
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

impl OsScanner for AmazonScanner {
    fn family(&self) -> OsFamily {
        OsFamily::Amazon
    }

    fn detect(&self, os_version: &str, packages: &[Package]) -> Result<Detection, DetectorError> {
        let os_ver = normalize_version(os_version);
        debug!(
            family = "amazon",
            os_version = os_ver,
            packages = packages.len(),
            "detecting vulnerabilities"
        );
        counter!(m::OSPKG_PACKAGES_SCANNED_TOTAL, m::LABEL_FAMILY => "amazon")
            .increment(packages.len() as u64);

        let mut detection = Detection::default();
        for pkg in packages {
            let (source, platform) = if pkg.vendor == EPEL_VENDOR {
                match epel_version(os_ver) {
                    Some(epel) if epel != UNSUPPORTED_EPEL => (&self.epel, epel_platform(epel)),
                    _ => {
                        debug!(
                            package = %pkg.name,
                            os_version = os_ver,
                            "EPEL advisories are not available, skipping"
                        );
                        continue;
                    }
                }
            } else {
                (&self.advisories, amazon_platform(os_ver))
            };

            let advisories = source
                .get(&platform, &pkg.name)
                .map_err(|e| source_error(source.name(), e))?;

            let installed = pkg.format_version();
            if installed.is_empty() {
                continue;
            }
            if let Err(e) = DebVersion::parse(&installed) {
                counter!(m::OSPKG_VERSION_ERRORS_TOTAL, m::LABEL_FAMILY => "amazon").increment(1);
                debug!(
                    package = %pkg.name,
                    error = %e,
                    "failed to parse installed package version"
                );
                continue;
            }

            detection.findings.extend(match_advisories(
                OsFamily::Amazon,
                &DebComparator,
                pkg,
                &installed,
                advisories,
            ));
        }

        Ok(detection)
    }

    fn is_supported_version(&self, os_version: &str) -> bool {
        let os_ver = normalize_version(os_version);
        supported_at(self.clock.as_ref(), OsFamily::Amazon, os_ver, eol_date(os_ver))
    }
}

/// 공백 기준 첫 필드가 `2`면 `2`, 아니면 `1`
///
/// `2 (Karoo)` → `2`, `2018.03` → `1`
pub fn normalize_version(os_version: &str) -> &'static str {
    match os_version.split_whitespace().next() {
        Some("2") => "2",
        _ => "1",
    }
}

/// 배포판 버전 → EPEL 버전
fn epel_version(os_ver: &str) -> Option<&'static str> {
    match os_ver {
        "1" => Some("6"),
        "2" => Some("7"),
        _ => None,
    }
}

fn eol_date(os_ver: &str) -> Option<DateTime<Utc>> {
    match os_ver {
        "1" => Utc.with_ymd_and_hms(2023, 6, 30, 23, 59, 59).single(),
        "2" => Utc.with_ymd_and_hms(3000, 1, 1, 23, 59, 59).single(),
        _ => None,
    }
}
