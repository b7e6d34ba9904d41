//! 배포판 계열 레지스트리
//!
//! [`DetectorRegistry`]는 배포판 계열 식별자를 스캐너 구현에 대응시킵니다.
//! 프로세스마다 하나를 만들어 호출 경로로 전달합니다.
//!
//! # 병렬 탐지
//!
//! 패키지 단위 매칭은 서로 독립적이므로 [`DetectorRegistry::detect_concurrent`]는
//! 패키지 목록을 워커 수만큼의 청크로 나눠 tokio 블로킹 워커에서 처리하고,
//! 입력 순서대로 결과를 합칩니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use strata_core::clock::Clock;
use strata_core::types::{DetectedVulnerability, OsFamily, Package};

use crate::advisory::AdvisorySource;
use crate::error::DetectorError;
use crate::scanner::{AlmaScanner, AmazonScanner, Detection, OsScanner};

/// 탐지 결과 보고서
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// 스캔 고유 ID
    pub scan_id: String,
    /// 배포판 계열
    pub family: OsFamily,
    /// 입력된 배포판 버전
    pub os_version: String,
    /// 검사한 패키지 수
    pub total_packages: usize,
    /// 탐지된 취약점
    pub findings: Vec<DetectedVulnerability>,
    /// 분류할 수 없어 건너뛴 패키지
    pub skipped_packages: Vec<String>,
}

impl DetectionReport {
    fn new(family: OsFamily, os_version: &str, total_packages: usize, detection: Detection) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            family,
            os_version: os_version.to_owned(),
            total_packages,
            findings: detection.findings,
            skipped_packages: detection.skipped_packages,
        }
    }

    /// 탐지된 취약점 수
    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    /// 취약점이 하나라도 있는지 여부
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// 배포판 계열 → 스캐너
pub struct DetectorRegistry {
    scanners: BTreeMap<OsFamily, Arc<dyn OsScanner>>,
    workers: usize,
}

impl DetectorRegistry {
    /// 빈 레지스트리를 생성합니다. `workers`는 최소 1로 보정됩니다.
    pub fn new(workers: usize) -> Self {
        Self {
            scanners: BTreeMap::new(),
            workers: workers.max(1),
        }
    }

    /// AlmaLinux, Amazon Linux 스캐너를 등록한 레지스트리를 생성합니다.
    ///
    /// 배포판 권고와 EPEL 권고 모두 `source`에서 조회합니다.
    pub fn with_defaults(
        source: Arc<dyn AdvisorySource>,
        clock: Arc<dyn Clock>,
        workers: usize,
    ) -> Self {
        let mut registry = Self::new(workers);
        registry.register(Arc::new(AlmaScanner::new(
            Arc::clone(&source),
            Arc::clone(&source),
            Arc::clone(&clock),
        )));
        registry.register(Arc::new(AmazonScanner::new(
            Arc::clone(&source),
            source,
            clock,
        )));
        registry
    }

    /// 스캐너를 등록합니다. 같은 계열의 기존 스캐너는 교체됩니다.
    pub fn register(&mut self, scanner: Arc<dyn OsScanner>) {
        self.scanners.insert(scanner.family(), scanner);
    }

    /// 등록된 배포판 계열 목록
    pub fn families(&self) -> Vec<OsFamily> {
        self.scanners.keys().copied().collect()
    }

    /// 병렬 탐지 워커 수
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 배포판 계열 문자열로 스캐너를 찾습니다.
    pub fn resolve(&self, family: &str) -> Result<Arc<dyn OsScanner>, DetectorError> {
        OsFamily::from_str_loose(family)
            .and_then(|f| self.scanners.get(&f))
            .cloned()
            .ok_or_else(|| DetectorError::UnsupportedFamily(family.to_owned()))
    }

    /// 배포판 버전이 지원 중인지 반환합니다.
    ///
    /// 알 수 없는 계열도 에러가 아니라 경고 로그와 함께 `false`입니다.
    pub fn is_supported_version(&self, family: &str, os_version: &str) -> bool {
        match self.resolve(family) {
            Ok(scanner) => scanner.is_supported_version(os_version),
            Err(_) => {
                warn!(family, os_version, "unknown OS family");
                false
            }
        }
    }

    /// 현재 스레드에서 탐지를 수행합니다.
    pub fn detect(
        &self,
        family: &str,
        os_version: &str,
        packages: &[Package],
    ) -> Result<DetectionReport, DetectorError> {
        let scanner = self.resolve(family)?;
        let detection = scanner.detect(os_version, packages)?;
        let report = DetectionReport::new(scanner.family(), os_version, packages.len(), detection);
        log_summary(&report);
        Ok(report)
    }

    /// 패키지 목록을 청크로 나눠 블로킹 워커에서 병렬로 탐지합니다.
    ///
    /// 결과의 순서는 입력 패키지 순서를 따릅니다. 한 청크라도 실패하면 첫 번째
    /// 에러를 반환합니다.
    pub async fn detect_concurrent(
        &self,
        family: &str,
        os_version: &str,
        packages: Vec<Package>,
    ) -> Result<DetectionReport, DetectorError> {
        let scanner = self.resolve(family)?;
        let total = packages.len();
        let chunk_size = total.div_ceil(self.workers).max(1);

        let mut handles = Vec::new();
        let mut remaining = packages;
        while !remaining.is_empty() {
            let rest = remaining.split_off(chunk_size.min(remaining.len()));
            let chunk = std::mem::replace(&mut remaining, rest);
            let scanner = Arc::clone(&scanner);
            let os_version = os_version.to_owned();
            handles.push(tokio::task::spawn_blocking(move || {
                scanner.detect(&os_version, &chunk)
            }));
        }

        let mut merged = Detection::default();
        let mut first_err = None;
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| DetectorError::Task(format!("spawn_blocking failed: {e}")))
                .and_then(|r| r);
            match result {
                Ok(detection) => merged.extend(detection),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        let report = DetectionReport::new(scanner.family(), os_version, total, merged);
        log_summary(&report);
        Ok(report)
    }
}

/// 보고서 단위로 한 번만 기록합니다. 청크별 탐지 결과에는 로그를 남기지 않습니다.
fn log_summary(report: &DetectionReport) {
    if !report.skipped_packages.is_empty() {
        info!(
            scan_id = %report.scan_id,
            family = %report.family,
            packages = ?report.skipped_packages,
            "skipped packages that cannot be classified correctly"
        );
    }
    info!(
        scan_id = %report.scan_id,
        family = %report.family,
        os_version = %report.os_version,
        packages = report.total_packages,
        vulnerabilities = report.findings.len(),
        skipped = report.skipped_packages.len(),
        "detection completed"
    );
}
