//! 유니온 해석기
//!
//! 레이어별 순회 결과를 병합해 유효 파일시스템을 만듭니다. 레이어는 항상
//! 오래된 것부터(가장 아래 레이어가 인덱스 0) 전달합니다.
//!
//! 경로는 어떤 레이어에 존재하고, 그보다 위 레이어의 whiteout이나 opaque
//! 마커에 가려지지 않을 때 보입니다. 레이어 N의 마커는 N보다 아래 레이어에만
//! 적용되고 N 자신이나 위 레이어에는 적용되지 않습니다.
//!
//! [`resolve_bottom_up`]과 [`resolve_top_down`]은 같은 결과를 냅니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::skip::is_same_or_under;
use crate::walker::LayerMarkers;

/// 한 레이어에서 수집한 파일과 마커
///
/// 직렬화할 수 있으므로 레이어 단위 결과를 블롭 캐시에 저장할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerContents<T> {
    /// 레이어 식별자
    pub layer_id: String,
    /// 경로 → 분석 결과
    pub files: BTreeMap<String, T>,
    /// opaque 디렉토리 (끝 `/` 없음, 루트는 빈 문자열)
    pub opaque_dirs: Vec<String>,
    /// whiteout 대상 경로
    pub whiteout_files: Vec<String>,
}

impl<T> LayerContents<T> {
    /// 빈 레이어 결과를 생성합니다.
    pub fn new(layer_id: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            files: BTreeMap::new(),
            opaque_dirs: Vec::new(),
            whiteout_files: Vec::new(),
        }
    }

    /// 순회 결과 마커를 붙입니다.
    pub fn with_markers(mut self, markers: LayerMarkers) -> Self {
        self.opaque_dirs = markers.opaque_dirs;
        self.whiteout_files = markers.whiteout_files;
        self
    }
}

/// 병합된 파일 하나
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleFile<T> {
    /// 파일이 유래한 레이어 인덱스 (0이 가장 아래)
    pub layer_index: usize,
    /// 분석 결과
    pub value: T,
}

/// 유효 파일시스템 (경로 순 정렬)
pub type MergedView<T> = BTreeMap<String, VisibleFile<T>>;

/// 누적 가림 집합
#[derive(Default)]
struct Suppression<'a> {
    opaque_dirs: Vec<&'a str>,
    whiteouts: Vec<&'a str>,
}

impl<'a> Suppression<'a> {
    fn from_layer<T>(layer: &'a LayerContents<T>) -> Self {
        let mut s = Self::default();
        s.extend(layer);
        s
    }

    fn extend<T>(&mut self, layer: &'a LayerContents<T>) {
        self.opaque_dirs
            .extend(layer.opaque_dirs.iter().map(String::as_str));
        self.whiteouts
            .extend(layer.whiteout_files.iter().map(String::as_str));
    }

    fn hides(&self, path: &str) -> bool {
        self.whiteouts.iter().any(|w| is_same_or_under(path, w))
            || self.opaque_dirs.iter().any(|d| is_strictly_under(path, d))
    }
}

/// `path`가 디렉토리 `dir`의 자손인지 확인합니다. 빈 `dir`은 루트입니다.
fn is_strictly_under(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return !path.is_empty();
    }
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
}

/// 아래 레이어부터 차례로 쌓으며 병합합니다.
///
/// 각 레이어마다 먼저 그 레이어의 마커로 누적 결과를 지우고, 그다음 레이어의
/// 파일을 덮어씁니다.
pub fn resolve_bottom_up<T: Clone>(layers: &[LayerContents<T>]) -> MergedView<T> {
    let mut view = MergedView::new();
    for (index, layer) in layers.iter().enumerate() {
        if !layer.opaque_dirs.is_empty() || !layer.whiteout_files.is_empty() {
            let hidden = Suppression::from_layer(layer);
            view.retain(|path, _| !hidden.hides(path));
        }
        for (path, value) in &layer.files {
            view.insert(
                path.clone(),
                VisibleFile {
                    layer_index: index,
                    value: value.clone(),
                },
            );
        }
    }
    view
}

/// 위 레이어부터 내려가며 병합합니다.
///
/// 이미 위 레이어에서 본 경로와 위 레이어 마커에 가려진 경로는 건너뜁니다.
pub fn resolve_top_down<T: Clone>(layers: &[LayerContents<T>]) -> MergedView<T> {
    let mut view = MergedView::new();
    let mut above = Suppression::default();
    for (index, layer) in layers.iter().enumerate().rev() {
        for (path, value) in &layer.files {
            if view.contains_key(path) || above.hides(path) {
                continue;
            }
            view.insert(
                path.clone(),
                VisibleFile {
                    layer_index: index,
                    value: value.clone(),
                },
            );
        }
        above.extend(layer);
    }
    view
}
