//! RPM 버전 비교
//!
//! `[epoch:]version[-release]` 형식을 파싱하고 `rpmvercmp` 규칙으로 비교합니다.
//!
//! # rpmvercmp 규칙
//!
//! - 영숫자가 아닌 문자는 구분자로만 쓰임
//! - 숫자 세그먼트는 수치로, 문자 세그먼트는 사전순으로 비교
//! - 숫자 세그먼트는 문자 세그먼트보다 큼
//! - `~`는 문자열 끝을 포함한 모든 것보다 작음 (`1.0~rc1 < 1.0`)
//! - `^`는 문자열 끝보다 크고 그 외 모든 것보다 작음 (`1.0 < 1.0^git1 < 1.0.1`)

use std::cmp::Ordering;
use std::fmt;

use super::{VersionComparator, VersionError, split_epoch};

/// 파싱된 RPM 버전
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmVersion {
    epoch: u64,
    version: String,
    release: String,
}

impl RpmVersion {
    /// 버전 문자열을 파싱합니다.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if s.is_empty() {
            return Err(VersionError::new(s, "empty version"));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(VersionError::new(s, "contains whitespace or control characters"));
        }

        let (epoch, rest) = split_epoch(s)?;
        let (version, release) = rest.rsplit_once('-').unwrap_or((rest, ""));

        if !version.bytes().any(|b| b.is_ascii_alphanumeric()) {
            return Err(VersionError::new(s, "version has no alphanumeric segment"));
        }

        Ok(Self {
            epoch,
            version: version.to_owned(),
            release: release.to_owned(),
        })
    }

    /// 에포크
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 업스트림 버전
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 릴리스
    pub fn release(&self) -> &str {
        &self.release
    }
}

impl Ord for RpmVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| rpmvercmp(&self.release, &other.release))
    }
}

impl PartialOrd for RpmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

/// RPM 규칙 비교기
#[derive(Debug, Clone, Copy, Default)]
pub struct RpmComparator;

impl VersionComparator for RpmComparator {
    fn name(&self) -> &'static str {
        "rpm"
    }

    fn compare(&self, a: &str, b: &str) -> Result<Ordering, VersionError> {
        Ok(RpmVersion::parse(a)?.cmp(&RpmVersion::parse(b)?))
    }
}

/// 세그먼트 단위 비교
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (mut one, mut two) = (a.as_bytes(), b.as_bytes());

    loop {
        one = trim_separators(one);
        two = trim_separators(two);

        if one.first() == Some(&b'~') || two.first() == Some(&b'~') {
            if one.first() != Some(&b'~') {
                return Ordering::Greater;
            }
            if two.first() != Some(&b'~') {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.first() == Some(&b'^') || two.first() == Some(&b'^') {
            if one.is_empty() {
                return Ordering::Less;
            }
            if two.is_empty() {
                return Ordering::Greater;
            }
            if one.first() != Some(&b'^') {
                return Ordering::Greater;
            }
            if two.first() != Some(&b'^') {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let (seg1, rest1) = split_segment(one, numeric);
        let (seg2, rest2) = split_segment(two, numeric);

        // 세그먼트 종류가 다르면 숫자 쪽이 큼
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            compare_numeric(seg1, seg2)
        } else {
            seg1.cmp(seg2)
        };
        if ord != Ordering::Equal {
            return ord;
        }

        one = rest1;
        two = rest2;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (false, _) => Ordering::Greater,
        (true, false) => Ordering::Less,
    }
}

fn trim_separators(s: &[u8]) -> &[u8] {
    let skip = s
        .iter()
        .take_while(|&&c| !c.is_ascii_alphanumeric() && c != b'~' && c != b'^')
        .count();
    &s[skip..]
}

fn split_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let len = s
        .iter()
        .take_while(|c| {
            if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        })
        .count();
    s.split_at(len)
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_leading_zeros(s: &[u8]) -> &[u8] {
    let zeros = s.iter().take_while(|&&c| c == b'0').count();
    &s[zeros..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        RpmComparator.compare(a, b).unwrap()
    }

    #[test]
    fn parse_full() {
        let v = RpmVersion::parse("1:2.4.6-90.el7").unwrap();
        assert_eq!(v.epoch(), 1);
        assert_eq!(v.version(), "2.4.6");
        assert_eq!(v.release(), "90.el7");
        assert_eq!(v.to_string(), "1:2.4.6-90.el7");
    }

    #[test]
    fn parse_without_release() {
        let v = RpmVersion::parse("3.2").unwrap();
        assert_eq!(v.epoch(), 0);
        assert_eq!(v.release(), "");
        assert_eq!(v.to_string(), "3.2");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(RpmVersion::parse("").is_err());
        assert!(RpmVersion::parse("a:1.0").is_err());
        assert!(RpmVersion::parse("1.0 -1").is_err());
        assert!(RpmVersion::parse("...-1").is_err());
    }

    #[test]
    fn release_ordering() {
        assert_eq!(cmp("2.4.6-90.el7", "2.4.6-93.el7"), Ordering::Less);
        assert_eq!(cmp("2.4.6-93.el7", "2.4.6-93.el7"), Ordering::Equal);
        assert_eq!(cmp("2.4.6-97.el7", "2.4.6-93.el7"), Ordering::Greater);
    }

    #[test]
    fn epoch_dominates() {
        assert_eq!(cmp("1:1.0-1", "2.0-1"), Ordering::Greater);
        assert_eq!(cmp("0:2.0-1", "2.0-1"), Ordering::Equal);
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(rpmvercmp("1.10", "1.9"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.010", "1.10"), Ordering::Equal);
        assert_eq!(rpmvercmp("1.0.1", "1.0"), Ordering::Greater);
    }

    #[test]
    fn numeric_beats_alpha() {
        assert_eq!(rpmvercmp("1.1", "1.a"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.a", "1.1"), Ordering::Less);
        assert_eq!(rpmvercmp("el7", "el8"), Ordering::Less);
    }

    #[test]
    fn tilde_sorts_first() {
        assert_eq!(rpmvercmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0~rc1", "1.0~rc2"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0", "1.0~rc1"), Ordering::Greater);
    }

    #[test]
    fn caret_sorts_after_end() {
        assert_eq!(rpmvercmp("1.0^git1", "1.0"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.0^git1", "1.0.1"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0", "1.0^"), Ordering::Less);
    }

    #[test]
    fn separators_are_interchangeable() {
        assert_eq!(rpmvercmp("1.0_1", "1.0.1"), Ordering::Equal);
        assert_eq!(rpmvercmp("1+0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn modular_release_strings() {
        assert_eq!(
            cmp(
                "2.4.37-39.module_el8.4.0+2270+3e5d9b69",
                "2.4.37-43.module_el8.5.0+2597+c4b14997"
            ),
            Ordering::Less
        );
    }

    #[test]
    fn malformed_side_is_error() {
        assert!(RpmComparator.compare("", "1.0-1").is_err());
        assert!(RpmComparator.compare("1.0-1", "x:1").is_err());
    }
}
