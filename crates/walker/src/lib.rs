#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 (`WalkerError`)
//! - [`config`]: 워커 설정 (`WalkerConfig`, 빌더, 메모리 임계값 프리셋)
//! - [`cached_file`]: 재열기 가능한 엔트리 바이트 소스 (`CachedFile`)
//! - [`skip`]: 건너뛰기 규칙과 경로 정규화 (`SkipRules`)
//! - [`walker`]: 단일 레이어 순회기 (`LayerTar`, `FileInfo`, `LayerMarkers`)
//! - [`union`]: 유니온 해석기 (`resolve_bottom_up`, `resolve_top_down`)
//! - [`layer`]: 레이어 파일 열기와 다중 레이어 순회 (`open_layer`, `walk_layers`)
//!
//! # Architecture
//!
//! ```text
//! layer files --> open_layer (tar / tar.gz)
//!                     |
//!              walk_layers (레이어별 spawn_blocking, fork-join)
//!                     |
//!                 LayerTar::walk --> SkipRules --> CachedFile --> analyze 콜백
//!                     |
//!              Vec<LayerContents>  (파일 + opaque/whiteout 마커)
//!                     |
//!              resolve_bottom_up / resolve_top_down
//!                     |
//!                 MergedView (유효 파일시스템)
//! ```

pub mod cached_file;
pub mod config;
pub mod error;
pub mod layer;
pub mod skip;
pub mod union;
pub mod walker;

// --- Public API Re-exports ---

// Configuration
pub use config::{DEFAULT_SIZE_THRESHOLD, SLOW_SIZE_THRESHOLD, WalkerConfig, WalkerConfigBuilder};

// Error
pub use error::{AnalyzeError, WalkerError};

// Byte source
pub use cached_file::{CachedFile, CachedReader};

// Walker
pub use skip::SkipRules;
pub use walker::{EntryKind, FileInfo, LayerMarkers, LayerTar, OPAQUE_MARKER, WHITEOUT_PREFIX};

// Union resolver
pub use union::{LayerContents, MergedView, VisibleFile, resolve_bottom_up, resolve_top_down};

// Layers
pub use layer::{LayerSource, open_layer, walk_layers};
