//! Debian 버전 비교
//!
//! `[epoch:]upstream_version[-debian_revision]` 형식을 파싱하고 dpkg의
//! `verrevcmp` 규칙으로 비교합니다. 문자 부분에서 `~`는 끝보다 작고, 문자는
//! 문자가 아닌 기호보다 작습니다.

use std::cmp::Ordering;
use std::fmt;

use super::{VersionComparator, VersionError, split_epoch};

/// 파싱된 Debian 버전
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebVersion {
    epoch: u64,
    upstream: String,
    revision: String,
}

impl DebVersion {
    /// 버전 문자열을 파싱합니다. 앞뒤 공백은 무시합니다.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::new(s, "empty version"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(VersionError::new(s, "contains embedded whitespace"));
        }

        let (epoch, rest) = split_epoch(trimmed)?;
        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((_, "")) => return Err(VersionError::new(s, "revision is empty")),
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };

        if upstream.is_empty() {
            return Err(VersionError::new(s, "upstream version is empty"));
        }
        if !upstream.as_bytes()[0].is_ascii_digit() {
            return Err(VersionError::new(s, "upstream version must start with a digit"));
        }
        if let Some(c) = upstream
            .chars()
            .find(|&c| !(c.is_ascii_alphanumeric() || ".+~-:".contains(c)))
        {
            return Err(VersionError::new(
                s,
                format!("invalid character '{c}' in upstream version"),
            ));
        }
        if let Some(c) = revision
            .chars()
            .find(|&c| !(c.is_ascii_alphanumeric() || ".+~".contains(c)))
        {
            return Err(VersionError::new(
                s,
                format!("invalid character '{c}' in revision"),
            ));
        }

        Ok(Self {
            epoch,
            upstream: upstream.to_owned(),
            revision: revision.to_owned(),
        })
    }

    /// 에포크
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 업스트림 버전
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// 배포판 리비전
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(self.upstream.as_bytes(), other.upstream.as_bytes()))
            .then_with(|| verrevcmp(self.revision.as_bytes(), other.revision.as_bytes()))
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if !self.revision.is_empty() {
            write!(f, "-{}", self.revision)?;
        }
        Ok(())
    }
}

/// Debian 규칙 비교기
#[derive(Debug, Clone, Copy, Default)]
pub struct DebComparator;

impl VersionComparator for DebComparator {
    fn name(&self) -> &'static str {
        "deb"
    }

    fn compare(&self, a: &str, b: &str) -> Result<Ordering, VersionError> {
        Ok(DebVersion::parse(a)?.cmp(&DebVersion::parse(b)?))
    }
}

/// 문자 부분 정렬 가중치
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

fn verrevcmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0usize, 0usize);
    let is_digit = |s: &[u8], k: usize| s.get(k).is_some_and(u8::is_ascii_digit);

    while i < a.len() || j < b.len() {
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit(a, i) && is_digit(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if is_digit(a, i) {
            return Ordering::Greater;
        }
        if is_digit(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        DebComparator.compare(a, b).unwrap()
    }

    #[test]
    fn parse_full() {
        let v = DebVersion::parse("1:1.0.2k-19.amzn2.0.1").unwrap();
        assert_eq!(v.epoch(), 1);
        assert_eq!(v.upstream(), "1.0.2k");
        assert_eq!(v.revision(), "19.amzn2.0.1");
        assert_eq!(v.to_string(), "1:1.0.2k-19.amzn2.0.1");
    }

    #[test]
    fn parse_hyphenated_upstream() {
        let v = DebVersion::parse("1.2-3-4").unwrap();
        assert_eq!(v.upstream(), "1.2-3");
        assert_eq!(v.revision(), "4");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(DebVersion::parse("").is_err());
        assert!(DebVersion::parse("   ").is_err());
        assert!(DebVersion::parse("a1.0").is_err());
        assert!(DebVersion::parse("1.0-").is_err());
        assert!(DebVersion::parse("1.0_1-1").is_err());
        assert!(DebVersion::parse("1.0-1_2").is_err());
        assert!(DebVersion::parse("x:1.0").is_err());
        assert!(DebVersion::parse("1.0 1").is_err());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(cmp(" 1.0-1 ", "1.0-1"), Ordering::Equal);
    }

    #[test]
    fn revision_ordering() {
        assert_eq!(cmp("2.4.6-90.amzn2", "2.4.6-93.amzn2"), Ordering::Less);
        assert_eq!(cmp("2.4.6-93.amzn2", "2.4.6-93.amzn2"), Ordering::Equal);
        assert_eq!(cmp("2.4.6-93.amzn2.0.1", "2.4.6-93.amzn2"), Ordering::Greater);
    }

    #[test]
    fn epoch_dominates() {
        assert_eq!(cmp("1:1.0", "9.9"), Ordering::Greater);
        assert_eq!(cmp("0:1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn tilde_sorts_before_end() {
        assert_eq!(cmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(cmp("1.0~~", "1.0~"), Ordering::Less);
        assert_eq!(cmp("1.0~rc1", "1.0~rc2"), Ordering::Less);
    }

    #[test]
    fn letters_sort_before_symbols() {
        assert_eq!(cmp("1.0a", "1.0+"), Ordering::Less);
        assert_eq!(cmp("1.0a", "1.0"), Ordering::Greater);
    }

    #[test]
    fn numeric_parts_compare_numerically() {
        assert_eq!(cmp("1.10", "1.9"), Ordering::Greater);
        assert_eq!(cmp("1.010", "1.10"), Ordering::Equal);
        assert_eq!(cmp("1.0.2k", "1.0.2j"), Ordering::Greater);
    }
}
