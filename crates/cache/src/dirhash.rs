//! 디렉토리 내용 해시
//!
//! 파일마다 `"<sha256 hex>  <상대 경로>\n"` 요약 줄을 만들고, 상대 경로 순으로
//! 정렬한 요약 전체를 다시 SHA-256으로 해시해 `h1:<hex>` 형식으로 반환합니다.
//! 결과는 파일 생성 순서나 디렉토리 순회 순서와 무관합니다.
//!
//! 디렉토리는 재귀 호출 없이 작업 목록으로 순회하고, 심볼릭 링크는 따라가지
//! 않습니다.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::error::CacheError;

const HASH_PREFIX: &str = "h1:";

/// 경로가 디렉토리면 [`hash_dir`], 파일이면 [`hash_file`] 결과를 반환합니다.
pub fn hash_contents(path: &Path) -> Result<String, CacheError> {
    let meta = std::fs::metadata(path).map_err(|e| hash_err(path, e))?;
    if meta.is_dir() {
        hash_dir(path)
    } else {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        hash_file(path, &name)
    }
}

/// 단일 파일을 `name`이라는 이름으로 해시합니다.
pub fn hash_file(path: &Path, name: &str) -> Result<String, CacheError> {
    summarize(&[(name.to_owned(), path.to_path_buf())])
}

/// 디렉토리 아래 모든 일반 파일을 해시합니다.
pub fn hash_dir(root: &Path) -> Result<String, CacheError> {
    let files = list_files(root)?;
    trace!(root = %root.display(), files = files.len(), "hashing directory");
    summarize(&files)
}

/// (상대 경로, 절대 경로) 목록을 반환합니다.
fn list_files(root: &Path) -> Result<Vec<(String, PathBuf)>, CacheError> {
    let mut files = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut worklist = vec![root.to_path_buf()];

    while let Some(dir) = worklist.pop() {
        let canonical = std::fs::canonicalize(&dir).map_err(|e| hash_err(&dir, e))?;
        if !visited.insert(canonical) {
            continue;
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| hash_err(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| hash_err(&dir, e))?;
            let path = entry.path();
            // DirEntry::file_type은 심볼릭 링크를 따라가지 않음
            let file_type = entry.file_type().map_err(|e| hash_err(&path, e))?;

            if file_type.is_dir() {
                worklist.push(path);
            } else if file_type.is_file() {
                let rel = relative_name(root, &path);
                files.push((rel, path));
            }
        }
    }

    Ok(files)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn summarize(files: &[(String, PathBuf)]) -> Result<String, CacheError> {
    let mut sorted: Vec<&(String, PathBuf)> = files.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut summary = Sha256::new();
    for (name, path) in sorted {
        if name.contains('\n') {
            return Err(CacheError::InvalidName {
                name: name.clone(),
                reason: "file names with newlines are not supported".to_owned(),
            });
        }
        let digest = hash_file_bytes(path)?;
        summary.update(format!("{digest}  {name}\n").as_bytes());
    }

    Ok(format!("{HASH_PREFIX}{}", hex::encode(summary.finalize())))
}

fn hash_file_bytes(path: &Path) -> Result<String, CacheError> {
    let mut file = File::open(path).map_err(|e| hash_err(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| hash_err(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn hash_err(path: &Path, source: io::Error) -> CacheError {
    CacheError::Hash {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn hash_has_prefix_and_hex_body() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rego", "package a");
        let hash = hash_dir(dir.path()).unwrap();
        assert!(hash.starts_with("h1:"));
        assert_eq!(hash.len(), 3 + 64);
    }

    #[test]
    fn creation_order_does_not_matter() {
        let d1 = tempfile::tempdir().unwrap();
        write(d1.path(), "x/1.rego", "one");
        write(d1.path(), "y/2.rego", "two");
        write(d1.path(), "z.json", "{}");

        let d2 = tempfile::tempdir().unwrap();
        write(d2.path(), "z.json", "{}");
        write(d2.path(), "y/2.rego", "two");
        write(d2.path(), "x/1.rego", "one");

        assert_eq!(hash_dir(d1.path()).unwrap(), hash_dir(d2.path()).unwrap());
    }

    #[test]
    fn content_change_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p/a.rego", "package a");
        let before = hash_dir(dir.path()).unwrap();
        write(dir.path(), "p/a.rego", "package b");
        assert_ne!(before, hash_dir(dir.path()).unwrap());
    }

    #[test]
    fn rename_changes_hash() {
        let d1 = tempfile::tempdir().unwrap();
        write(d1.path(), "a.rego", "same");
        let d2 = tempfile::tempdir().unwrap();
        write(d2.path(), "b.rego", "same");
        assert_ne!(hash_dir(d1.path()).unwrap(), hash_dir(d2.path()).unwrap());
    }

    #[test]
    fn file_hash_is_keyed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one/policy.rego", "same");
        write(dir.path(), "two/other.rego", "same");
        let a = hash_contents(&dir.path().join("one/policy.rego")).unwrap();
        let b = hash_contents(&dir.path().join("two/other.rego")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn single_file_dir_equals_file_hash() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "policy.rego", "x");
        let as_dir = hash_dir(dir.path()).unwrap();
        let as_file = hash_contents(&dir.path().join("policy.rego")).unwrap();
        assert_eq!(as_dir, as_file);
    }

    #[test]
    fn empty_dir_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let hash = hash_dir(dir.path()).unwrap();
        assert!(hash.starts_with("h1:"));
    }

    #[test]
    fn missing_path_is_error() {
        let err = hash_contents(Path::new("/nonexistent/strata/policies")).unwrap_err();
        match err {
            CacheError::Hash { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "real/a.rego", "a");
        let plain = hash_dir(dir.path()).unwrap();

        // 자기 자신을 가리키는 순환 링크와 파일 링크 모두 무시되어야 함
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/a.rego"), dir.path().join("link.rego"))
            .unwrap();
        assert_eq!(plain, hash_dir(dir.path()).unwrap());
    }
}
