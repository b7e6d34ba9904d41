//! 건너뛰기 규칙과 경로 정규화
//!
//! 패턴은 `**`를 지원하는 glob이며 `*`는 경로 구분자를 넘지 않습니다.
//! `proc`, `sys`, `dev` 디렉토리와 이름이 `.git`인 디렉토리는 항상 건너뜁니다.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::WalkerError;

/// 항상 건너뛰는 시스템 디렉토리
pub const SYSTEM_DIRS: &[&str] = &["proc", "sys", "dev"];

/// 항상 건너뛰는 디렉토리 이름
const SKIP_DIR_NAMES: &[&str] = &[".git"];

/// 컴파일된 건너뛰기 규칙
#[derive(Debug, Clone)]
pub struct SkipRules {
    files: GlobSet,
    dirs: GlobSet,
}

impl SkipRules {
    /// 패턴을 정규화하고 컴파일합니다.
    ///
    /// # Errors
    ///
    /// 유효하지 않은 glob 패턴이 있으면 `WalkerError::Pattern` 반환
    pub fn new(skip_files: &[String], skip_dirs: &[String]) -> Result<Self, WalkerError> {
        let system_dirs: Vec<String> = SYSTEM_DIRS.iter().map(|d| (*d).to_owned()).collect();
        Ok(Self {
            files: compile(skip_files.iter())?,
            dirs: compile(skip_dirs.iter().chain(system_dirs.iter()))?,
        })
    }

    /// 정규화된 디렉토리 경로를 건너뛸지 판단합니다.
    pub fn should_skip_dir(&self, path: &str) -> bool {
        let base = path.rsplit('/').next().unwrap_or(path);
        SKIP_DIR_NAMES.contains(&base) || self.dirs.is_match(path)
    }

    /// `path`의 상위 디렉토리 중 건너뛸 디렉토리가 있으면 가장 얕은 것을 반환합니다.
    ///
    /// 디렉토리 헤더가 없거나 파일보다 늦게 나오는 레이어에서도 하위 엔트리를
    /// 걸러낼 수 있습니다. `path` 자신은 검사하지 않습니다.
    pub fn skipped_ancestor<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.match_indices('/')
            .map(|(idx, _)| &path[..idx])
            .find(|dir| self.should_skip_dir(dir))
    }

    /// 정규화된 파일 경로를 건너뛸지 판단합니다.
    pub fn should_skip_file(&self, path: &str) -> bool {
        self.files.is_match(path)
    }
}

fn compile<'p>(patterns: impl Iterator<Item = &'p String>) -> Result<GlobSet, WalkerError> {
    let mut builder = GlobSetBuilder::new();
    for raw in patterns {
        let pattern = clean_path(raw);
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| WalkerError::Pattern {
                pattern: raw.clone(),
                reason: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| WalkerError::Pattern {
        pattern: "<set>".to_owned(),
        reason: e.to_string(),
    })
}

/// 경로를 정규화합니다.
///
/// `\`를 `/`로 바꾸고 `.`과 `..`을 접은 뒤 앞쪽 `/`를 제거합니다.
/// 경로는 루트 기준으로 취급하므로 루트를 넘는 `..`은 버립니다.
/// 루트 자신은 빈 문자열이 됩니다.
pub fn clean_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// `path`가 기록된 건너뛴 디렉토리 중 하나와 같거나 그 아래에 있는지 확인합니다.
///
/// 경계는 경로 구분자 기준입니다 (`usr/share`는 `usr/sharex`를 포함하지 않음).
pub fn under_skipped_dir(path: &str, skipped: &[String]) -> bool {
    skipped.iter().any(|dir| is_same_or_under(path, dir))
}

/// `path == dir` 이거나 `path`가 `dir/` 아래에 있는지 확인합니다.
pub(crate) fn is_same_or_under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
