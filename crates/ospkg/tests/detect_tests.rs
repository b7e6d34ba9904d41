//! Integration tests for OS package vulnerability detection
//!
//! Covers AlmaLinux and Amazon Linux routing, naming normalization,
//! version comparison outcomes, EOL gating and the concurrent registry path.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use strata_core::clock::{Clock, FixedClock, SystemClock};
use strata_core::types::{Advisory, LayerInfo, OsFamily, Package};
use strata_ospkg::advisory::AdvisoryEntry;
use strata_ospkg::{
    AdvisoryDb, AdvisorySource, AlmaScanner, AmazonScanner, DetectorError, DetectorRegistry,
    OsScanner,
};

/// Records every lookup and serves from an in-memory db.
struct RecordingSource {
    db: AdvisoryDb,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSource {
    fn new(entries: Vec<AdvisoryEntry>) -> Arc<Self> {
        Arc::new(Self {
            db: AdvisoryDb::from_entries(entries),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl AdvisorySource for RecordingSource {
    fn name(&self) -> &str {
        "recording"
    }

    fn get(&self, platform: &str, pkg_name: &str) -> Result<Vec<Advisory>, DetectorError> {
        self.calls
            .lock()
            .unwrap()
            .push((platform.to_owned(), pkg_name.to_owned()));
        self.db.get(platform, pkg_name)
    }
}

/// Always fails, for error propagation tests.
struct BrokenSource;

impl AdvisorySource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn get(&self, _: &str, _: &str) -> Result<Vec<Advisory>, DetectorError> {
        Err(DetectorError::AdvisoryDbParse("bucket is corrupt".to_owned()))
    }
}

fn entry(platform: &str, package: &str, id: &str, fixed: &str) -> AdvisoryEntry {
    AdvisoryEntry {
        platform: platform.to_owned(),
        package: package.to_owned(),
        vulnerability_id: id.to_owned(),
        fixed_version: fixed.to_owned(),
        data_source: None,
        custom: None,
    }
}

fn package(name: &str, version: &str, release: &str) -> Package {
    Package {
        name: name.to_owned(),
        version: version.to_owned(),
        release: release.to_owned(),
        arch: "x86_64".to_owned(),
        layer: LayerInfo {
            digest: "sha256:base".to_owned(),
            diff_id: "sha256:diff".to_owned(),
        },
        ..Default::default()
    }
}

fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

fn clock_at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
    ))
}

fn alma(source: Arc<dyn AdvisorySource>, epel: Arc<dyn AdvisorySource>) -> AlmaScanner {
    AlmaScanner::new(source, epel, system_clock())
}

// --- AlmaLinux ---

#[test]
fn alma_httpd_older_release_is_one_finding() {
    let source = RecordingSource::new(vec![entry("alma 8", "httpd", "CVE-2024-1001", "2.4.6-93.el7")]);
    let scanner = alma(source.clone(), RecordingSource::new(vec![]));

    let detection = scanner
        .detect("8", &[package("httpd", "2.4.6", "90.el7")])
        .unwrap();

    assert_eq!(detection.findings.len(), 1);
    let finding = &detection.findings[0];
    assert_eq!(finding.vulnerability_id, "CVE-2024-1001");
    assert_eq!(finding.pkg_name, "httpd");
    assert_eq!(finding.installed_version, "2.4.6-90.el7");
    assert_eq!(finding.fixed_version, "2.4.6-93.el7");
    assert_eq!(finding.layer.diff_id, "sha256:diff");
}

#[test]
fn alma_point_release_queries_major_bucket() {
    let source = RecordingSource::new(vec![entry("alma 8", "httpd", "CVE-2024-1001", "2.4.6-93.el7")]);
    let scanner = alma(source.clone(), RecordingSource::new(vec![]));

    let detection = scanner
        .detect("8.5", &[package("httpd", "2.4.6", "90.el7")])
        .unwrap();

    assert_eq!(detection.findings.len(), 1);
    assert_eq!(source.calls(), vec![("alma 8".to_owned(), "httpd".to_owned())]);
}

#[test]
fn alma_equal_or_newer_is_not_vulnerable() {
    let source = RecordingSource::new(vec![
        entry("alma 8", "openssl", "CVE-A", "1:1.1.1k-5.el8"),
        entry("alma 8", "openssl", "CVE-B", "1:1.1.1k-4.el8"),
    ]);
    let scanner = alma(source, RecordingSource::new(vec![]));

    let mut pkg = package("openssl", "1.1.1k", "5.el8");
    pkg.epoch = 1;
    let detection = scanner.detect("8", &[pkg]).unwrap();
    assert!(detection.findings.is_empty());
}

#[test]
fn alma_malformed_versions_are_skipped() {
    let source = RecordingSource::new(vec![
        entry("alma 8", "bash", "CVE-BAD", "not:a-version"),
        entry("alma 8", "bash", "CVE-EMPTY", ""),
        entry("alma 8", "bash", "CVE-GOOD", "4.4.20-2.el8"),
    ]);
    let scanner = alma(source, RecordingSource::new(vec![]));

    let detection = scanner
        .detect("8", &[package("bash", "4.4.19", "14.el8")])
        .unwrap();
    let ids: Vec<&str> = detection
        .findings
        .iter()
        .map(|f| f.vulnerability_id.as_str())
        .collect();
    assert_eq!(ids, vec!["CVE-GOOD"]);
}

#[test]
fn alma_epel_routing_is_exclusive() {
    let primary = RecordingSource::new(vec![entry("alma 8", "htop", "CVE-PRIMARY", "9.9-1.el8")]);
    let epel = RecordingSource::new(vec![entry("epel 8", "htop", "CVE-EPEL", "3.2.1-1.el8")]);
    let scanner = alma(primary.clone(), epel.clone());

    let mut pkg = package("htop", "3.0.5", "1.el8");
    pkg.vendor = "Fedora Project".to_owned();
    let detection = scanner.detect("8.6", &[pkg]).unwrap();

    assert_eq!(detection.findings.len(), 1);
    assert_eq!(detection.findings[0].vulnerability_id, "CVE-EPEL");
    assert!(primary.calls().is_empty());
    assert_eq!(epel.calls(), vec![("epel 8".to_owned(), "htop".to_owned())]);
}

#[test]
fn alma_modular_release_is_skipped_and_reported() {
    let primary = RecordingSource::new(vec![entry(
        "alma 8",
        "nodejs:12::nodejs",
        "CVE-NODE",
        "99:1-1",
    )]);
    let scanner = alma(primary.clone(), RecordingSource::new(vec![]));

    let mut modular = package("nodejs", "12.22.1", "1.module_el8.4.0+2333+0e1d5bd8");
    modular.modularity_label = "nodejs:12:8040020210708131418:522a0ee4".to_owned();
    let plain = package("zlib", "1.2.11", "17.el8");

    let detection = scanner.detect("8", &[modular, plain]).unwrap();
    assert!(detection.findings.is_empty());
    assert_eq!(detection.skipped_packages, vec!["nodejs"]);
    assert_eq!(primary.calls(), vec![("alma 8".to_owned(), "zlib".to_owned())]);
}

#[test]
fn alma_modularity_label_rewrites_lookup_name() {
    let epel = RecordingSource::new(vec![entry(
        "epel 8",
        "nodejs:12::npm",
        "CVE-NPM",
        "1:6.14.12-1.el8",
    )]);
    let scanner = alma(RecordingSource::new(vec![]), epel.clone());

    let mut pkg = package("npm", "6.14.11", "1.el8");
    pkg.epoch = 1;
    pkg.vendor = "Fedora Project".to_owned();
    pkg.modularity_label = "nodejs:12:8030020201124152102:229f0a1c".to_owned();

    let detection = scanner.detect("8", &[pkg]).unwrap();
    assert_eq!(epel.calls(), vec![("epel 8".to_owned(), "nodejs:12::npm".to_owned())]);
    assert_eq!(detection.findings.len(), 1);
    // 결과에는 원래 패키지 이름과 렌더링된 설치 버전이 실림
    assert_eq!(detection.findings[0].pkg_name, "npm");
    assert_eq!(detection.findings[0].installed_version, "1:6.14.11-1.el8");
}

#[test]
fn alma_source_failure_is_fatal() {
    let scanner = alma(Arc::new(BrokenSource), RecordingSource::new(vec![]));
    let err = scanner
        .detect("8", &[package("httpd", "2.4.6", "90.el7")])
        .unwrap_err();
    match err {
        DetectorError::AdvisorySource { source_name, reason } => {
            assert_eq!(source_name, "broken");
            assert!(reason.contains("bucket is corrupt"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn alma_eol_boundary() {
    let before = AlmaScanner::new(
        Arc::new(AdvisoryDb::empty()),
        Arc::new(AdvisoryDb::empty()),
        clock_at(2029, 12, 31, 23, 59, 58),
    );
    let at = AlmaScanner::new(
        Arc::new(AdvisoryDb::empty()),
        Arc::new(AdvisoryDb::empty()),
        clock_at(2029, 12, 31, 23, 59, 59),
    );
    let after = AlmaScanner::new(
        Arc::new(AdvisoryDb::empty()),
        Arc::new(AdvisoryDb::empty()),
        clock_at(2030, 1, 1, 0, 0, 0),
    );

    assert!(before.is_supported_version("8.5"));
    assert!(before.is_supported_version("8"));
    assert!(!at.is_supported_version("8.5"));
    assert!(!after.is_supported_version("8"));
}

#[test]
fn alma_unknown_version_is_unsupported() {
    let scanner = alma(Arc::new(AdvisoryDb::empty()), Arc::new(AdvisoryDb::empty()));
    assert!(!scanner.is_supported_version("7.9"));
    assert!(!scanner.is_supported_version(""));
}

// --- Amazon Linux ---

fn amazon(
    source: Arc<dyn AdvisorySource>,
    epel: Arc<dyn AdvisorySource>,
    clock: Arc<dyn Clock>,
) -> AmazonScanner {
    AmazonScanner::new(source, epel, clock)
}

#[test]
fn amazon_version_two_uses_amazon_linux_2_bucket() {
    let mut fixed = entry("amazon linux 2", "curl", "ALAS2-2024-001", "7.79.1-4.amzn2.0.1");
    fixed.custom = Some(serde_json::json!({"severity": "important"}));
    let source = RecordingSource::new(vec![fixed]);
    let scanner = amazon(source.clone(), RecordingSource::new(vec![]), system_clock());

    let detection = scanner
        .detect("2 (Karoo)", &[package("curl", "7.79.1", "1.amzn2.0.1")])
        .unwrap();

    assert_eq!(source.calls(), vec![("amazon linux 2".to_owned(), "curl".to_owned())]);
    assert_eq!(detection.findings.len(), 1);
    assert_eq!(detection.findings[0].fixed_version, "7.79.1-4.amzn2.0.1");
    assert_eq!(
        detection.findings[0].custom,
        Some(serde_json::json!({"severity": "important"}))
    );
}

#[test]
fn amazon_other_versions_map_to_one() {
    let source = RecordingSource::new(vec![]);
    let scanner = amazon(source.clone(), RecordingSource::new(vec![]), system_clock());

    scanner
        .detect("2018.03", &[package("curl", "7.61.1", "12.95.amzn1")])
        .unwrap();
    assert_eq!(source.calls(), vec![("amazon linux 1".to_owned(), "curl".to_owned())]);
}

#[test]
fn amazon_epel_uses_companion_version() {
    let epel = RecordingSource::new(vec![entry("epel 7", "htop", "CVE-EPEL", "2.2.0-4.el7")]);
    let primary = RecordingSource::new(vec![]);
    let scanner = amazon(primary.clone(), epel.clone(), system_clock());

    let mut pkg = package("htop", "2.2.0", "3.el7");
    pkg.vendor = "Fedora Project".to_owned();
    let detection = scanner.detect("2", &[pkg]).unwrap();

    assert_eq!(detection.findings.len(), 1);
    assert!(primary.calls().is_empty());
    assert_eq!(epel.calls(), vec![("epel 7".to_owned(), "htop".to_owned())]);
}

#[test]
fn amazon_one_epel_packages_are_skipped() {
    let epel = RecordingSource::new(vec![entry("epel 6", "htop", "CVE-EPEL6", "9.9-1")]);
    let primary = RecordingSource::new(vec![]);
    let scanner = amazon(primary.clone(), epel.clone(), system_clock());

    let mut pkg = package("htop", "1.0.3", "1.el6");
    pkg.vendor = "Fedora Project".to_owned();
    let detection = scanner.detect("2018.03", &[pkg]).unwrap();

    assert!(detection.findings.is_empty());
    assert!(epel.calls().is_empty());
    assert!(primary.calls().is_empty());
}

#[test]
fn amazon_unparseable_installed_version_is_skipped() {
    let source = RecordingSource::new(vec![
        entry("amazon linux 2", "weird", "CVE-W", "2.0-1"),
        entry("amazon linux 2", "empty", "CVE-E", "2.0-1"),
    ]);
    let scanner = amazon(source, RecordingSource::new(vec![]), system_clock());

    let detection = scanner
        .detect(
            "2",
            &[package("weird", "beta", "1"), package("empty", "", "")],
        )
        .unwrap();
    assert!(detection.findings.is_empty());
}

#[test]
fn amazon_eol_boundaries() {
    let empty = || -> Arc<dyn AdvisorySource> { Arc::new(AdvisoryDb::empty()) };
    let before = amazon(empty(), empty(), clock_at(2023, 6, 30, 23, 59, 58));
    let after = amazon(empty(), empty(), clock_at(2023, 7, 1, 0, 0, 0));

    assert!(before.is_supported_version("2018.03"));
    assert!(!after.is_supported_version("2018.03"));
    assert!(after.is_supported_version("2"));
    assert!(after.is_supported_version("2 (Karoo)"));
}

// --- Registry ---

#[test]
fn registry_detects_by_family_name() {
    let db = Arc::new(AdvisoryDb::from_entries(vec![entry(
        "alma 8",
        "httpd",
        "CVE-2024-1001",
        "2.4.6-93.el7",
    )]));
    let registry = DetectorRegistry::with_defaults(db, system_clock(), 1);

    let report = registry
        .detect("AlmaLinux", "8.5", &[package("httpd", "2.4.6", "90.el7")])
        .unwrap();
    assert_eq!(report.family, OsFamily::Alma);
    assert_eq!(report.os_version, "8.5");
    assert_eq!(report.total_packages, 1);
    assert_eq!(report.finding_count(), 1);
}

#[test]
fn registry_supported_version_delegates() {
    let registry = DetectorRegistry::with_defaults(
        Arc::new(AdvisoryDb::empty()),
        clock_at(2025, 1, 1, 0, 0, 0),
        1,
    );
    assert!(registry.is_supported_version("alma", "8.9"));
    assert!(!registry.is_supported_version("amazon", "2018.03"));
    assert!(!registry.is_supported_version("gentoo", "2.14"));
}

#[tokio::test]
async fn concurrent_detection_matches_sequential_order() {
    let entries: Vec<AdvisoryEntry> = (0..50)
        .map(|i| entry("alma 8", &format!("pkg{i}"), &format!("CVE-{i}"), "1.0-2.el8"))
        .collect();
    let packages: Vec<Package> = (0..50)
        .map(|i| {
            // 짝수만 취약
            let release = if i % 2 == 0 { "1.el8" } else { "2.el8" };
            package(&format!("pkg{i}"), "1.0", release)
        })
        .collect();

    let registry = DetectorRegistry::with_defaults(
        Arc::new(AdvisoryDb::from_entries(entries)),
        system_clock(),
        4,
    );

    let sequential = registry.detect("alma", "8", &packages).unwrap();
    let concurrent = registry
        .detect_concurrent("alma", "8", packages)
        .await
        .unwrap();

    assert_eq!(concurrent.finding_count(), 25);
    assert_eq!(concurrent.findings, sequential.findings);
    assert_eq!(concurrent.total_packages, 50);
    assert_ne!(concurrent.scan_id, sequential.scan_id);
}

#[tokio::test]
async fn concurrent_detection_propagates_source_failure() {
    let mut registry = DetectorRegistry::new(3);
    registry.register(Arc::new(AlmaScanner::new(
        Arc::new(BrokenSource),
        Arc::new(BrokenSource),
        system_clock(),
    )));

    let packages: Vec<Package> = (0..10)
        .map(|i| package(&format!("pkg{i}"), "1.0", "1.el8"))
        .collect();
    let err = registry
        .detect_concurrent("alma", "8", packages)
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::AdvisorySource { .. }));
}

#[tokio::test]
async fn concurrent_detection_with_no_packages() {
    let registry = DetectorRegistry::with_defaults(Arc::new(AdvisoryDb::empty()), system_clock(), 8);
    let report = registry.detect_concurrent("amazon", "2", Vec::new()).await.unwrap();
    assert_eq!(report.total_packages, 0);
    assert!(report.findings.is_empty());
}
