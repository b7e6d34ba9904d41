//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 레이어 워커, 캐시, OS 패키지 탐지기가 공유하는 데이터 구조를 정의합니다.
//! 리포트 작성기 등 외부 협력자는 이 타입들(패키지 목록, 탐지된 취약점 목록)을
//! 그대로 소비합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 레이어 식별 정보
///
/// 패키지나 탐지 결과가 어느 레이어에서 유래했는지 추적합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerInfo {
    /// 압축된 레이어 다이제스트 (예: `sha256:abc...`)
    pub digest: String,
    /// 비압축 레이어 다이제스트 (diff_id)
    pub diff_id: String,
}

impl fmt::Display for LayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.diff_id.is_empty() {
            write!(f, "{}", self.digest)
        } else {
            write!(f, "{}", self.diff_id)
        }
    }
}

/// 설치된 OS 패키지 레코드
///
/// OS 패키지 분석기(rpmdb, dpkg status 등)가 유효 파일시스템에서 추출한 결과입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// 패키지 이름
    pub name: String,
    /// 에포크 (0이면 렌더링 시 생략)
    pub epoch: u32,
    /// 업스트림 버전
    pub version: String,
    /// 릴리스
    pub release: String,
    /// 아키텍처
    pub arch: String,
    /// 소스 패키지 이름
    pub src_name: String,
    /// 소스 패키지 에포크
    pub src_epoch: u32,
    /// 소스 패키지 버전
    pub src_version: String,
    /// 소스 패키지 릴리스
    pub src_release: String,
    /// 모듈 스트림 레이블 (예: `nodejs:12:8030020201124152102:229f0a1c`)
    pub modularity_label: String,
    /// 벤더/출처 태그 (예: `Fedora Project`)
    pub vendor: String,
    /// 패키지가 설치된 레이어
    pub layer: LayerInfo,
}

impl Package {
    /// `epoch:version-release` 규칙으로 비교 가능한 버전 문자열을 렌더링합니다.
    pub fn format_version(&self) -> String {
        format_version(self.epoch, &self.version, &self.release)
    }

    /// 소스 패키지 버전을 같은 규칙으로 렌더링합니다.
    pub fn format_src_version(&self) -> String {
        format_version(self.src_epoch, &self.src_version, &self.src_release)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.format_version())
    }
}

/// `epoch:version-release` 렌더링
///
/// - release가 비어 있으면 `-release`를 생략합니다.
/// - epoch가 0이면 `epoch:`를 생략합니다.
pub fn format_version(epoch: u32, version: &str, release: &str) -> String {
    let mut rendered = version.to_owned();
    if !release.is_empty() {
        rendered = format!("{rendered}-{release}");
    }
    if epoch != 0 {
        rendered = format!("{epoch}:{rendered}");
    }
    rendered
}

/// 권고 데이터 출처
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    /// 출처 ID (예: `alma`, `amazon`, `epel`)
    pub id: String,
    /// 표시 이름
    pub name: String,
    /// 출처 URL
    pub url: String,
}

/// 보안 권고 레코드
///
/// `(배포판 버전, 패키지 이름)`으로 조회되며, 취약점 ID와 수정 버전을 연결합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// 취약점 ID (예: CVE-2024-1234)
    pub vulnerability_id: String,
    /// 수정된 버전 문자열
    pub fixed_version: String,
    /// 데이터 출처
    #[serde(default)]
    pub data_source: Option<DataSource>,
    /// 배포판별 부가 메타데이터
    #[serde(default)]
    pub custom: Option<serde_json::Value>,
}

/// 탐지된 취약점
///
/// 스캔마다 일시적으로 생성되며 이 코어에서 영속화하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedVulnerability {
    /// 취약점 ID
    pub vulnerability_id: String,
    /// 패키지 이름 (네임스페이스 재작성 전 원래 이름)
    pub pkg_name: String,
    /// 설치된 버전 (렌더링된 문자열)
    pub installed_version: String,
    /// 권고에 선언된 수정 버전
    pub fixed_version: String,
    /// 패키지가 유래한 레이어
    pub layer: LayerInfo,
    /// 데이터 출처
    pub data_source: Option<DataSource>,
    /// 배포판별 부가 메타데이터
    pub custom: Option<serde_json::Value>,
}

impl fmt::Display for DetectedVulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} (fixed: {})",
            self.vulnerability_id, self.pkg_name, self.installed_version, self.fixed_version,
        )
    }
}

/// 지원하는 배포판 계열
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OsFamily {
    /// AlmaLinux
    Alma,
    /// Amazon Linux
    Amazon,
}

impl OsFamily {
    /// 문자열에서 배포판 계열을 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "alma" | "almalinux" => Some(Self::Alma),
            "amazon" | "amzn" | "amazon linux" | "amazonlinux" => Some(Self::Amazon),
            _ => None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alma => write!(f, "alma"),
            Self::Amazon => write!(f, "amazon"),
        }
    }
}
