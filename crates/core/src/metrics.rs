//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 익스포터 설치는 바이너리의 몫입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `strata_`
//! - 모듈명: `walker_`, `cache_`, `ospkg_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(strata_core::metrics::WALKER_FILES_ANALYZED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 배포판 계열 레이블 키 (alma, amazon)
pub const LABEL_FAMILY: &str = "family";

/// 건너뛴 사유 레이블 키 (skip_dir, skip_file, link, under_skip_dir)
pub const LABEL_REASON: &str = "reason";

// ─── Walker 메트릭 ─────────────────────────────────────────────────

/// Walker: 처리한 레이어 수 (counter)
pub const WALKER_LAYERS_TOTAL: &str = "strata_walker_layers_total";

/// Walker: 분석 콜백에 전달된 파일 수 (counter)
pub const WALKER_FILES_ANALYZED_TOTAL: &str = "strata_walker_files_analyzed_total";

/// Walker: 건너뛴 엔트리 수 (counter, label: reason)
pub const WALKER_ENTRIES_SKIPPED_TOTAL: &str = "strata_walker_entries_skipped_total";

/// Walker: 임시 파일로 내려쓴 엔트리 수 (counter)
pub const WALKER_SPILLED_FILES_TOTAL: &str = "strata_walker_spilled_files_total";

// ─── Cache 메트릭 ──────────────────────────────────────────────────

/// Cache: 계산한 캐시 키 수 (counter)
pub const CACHE_KEYS_CALCULATED_TOTAL: &str = "strata_cache_keys_calculated_total";

/// Cache: 블롭 캐시 적중 수 (counter)
pub const CACHE_HITS_TOTAL: &str = "strata_cache_hits_total";

/// Cache: 블롭 캐시 미스 수 (counter)
pub const CACHE_MISSES_TOTAL: &str = "strata_cache_misses_total";

// ─── OS Package 메트릭 ─────────────────────────────────────────────

/// OS 패키지: 검사한 패키지 수 (counter, label: family)
pub const OSPKG_PACKAGES_SCANNED_TOTAL: &str = "strata_ospkg_packages_scanned_total";

/// OS 패키지: 탐지된 취약점 수 (counter, label: family)
pub const OSPKG_VULNS_DETECTED_TOTAL: &str = "strata_ospkg_vulns_detected_total";

/// OS 패키지: 버전 파싱 실패로 건너뛴 비교 수 (counter, label: family)
pub const OSPKG_VERSION_ERRORS_TOTAL: &str = "strata_ospkg_version_errors_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 효과가 없습니다.
pub fn describe_metrics() {
    use metrics::describe_counter;

    describe_counter!(WALKER_LAYERS_TOTAL, "Number of layer archives walked");
    describe_counter!(
        WALKER_FILES_ANALYZED_TOTAL,
        "Number of files handed to the analysis callback"
    );
    describe_counter!(
        WALKER_ENTRIES_SKIPPED_TOTAL,
        "Number of archive entries dropped by skip rules or type"
    );
    describe_counter!(
        WALKER_SPILLED_FILES_TOTAL,
        "Number of entries spilled to a temporary file"
    );
    describe_counter!(CACHE_KEYS_CALCULATED_TOTAL, "Number of cache keys derived");
    describe_counter!(CACHE_HITS_TOTAL, "Number of blob cache hits");
    describe_counter!(CACHE_MISSES_TOTAL, "Number of blob cache misses");
    describe_counter!(
        OSPKG_PACKAGES_SCANNED_TOTAL,
        "Number of OS packages checked against advisories"
    );
    describe_counter!(OSPKG_VULNS_DETECTED_TOTAL, "Number of detected vulnerabilities");
    describe_counter!(
        OSPKG_VERSION_ERRORS_TOTAL,
        "Number of advisory comparisons skipped due to malformed versions"
    );
}
