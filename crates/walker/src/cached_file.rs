//! 재열기 가능한 엔트리 바이트 소스
//!
//! tar 엔트리의 내용은 한 번만 순차적으로 읽을 수 있습니다. [`CachedFile`]은
//! 첫 번째 [`open`](CachedFile::open) 호출 시점에 내용을 한 번 읽어서
//! 크기가 임계값 이하이면 메모리에, 초과하면 임시 파일에 보관하고,
//! 이후의 `open`은 보관된 내용을 처음부터 다시 읽습니다.
//!
//! 임시 파일은 [`clean`](CachedFile::clean) 또는 drop 시점에 삭제됩니다.
//! 콜백이 에러로 조기 반환해도 임시 파일이 남지 않습니다.

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use metrics::counter;
use tempfile::NamedTempFile;
use tracing::{trace, warn};

use strata_core::metrics as m;

/// 엔트리 하나의 처리 구간 동안 유효한 바이트 소스
pub struct CachedFile<'a> {
    source: Option<&'a mut dyn Read>,
    size: u64,
    threshold: u64,
    state: State,
}

enum State {
    Pending,
    Memory(Vec<u8>),
    Spilled(NamedTempFile),
    Failed { kind: io::ErrorKind, message: String },
}

impl<'a> CachedFile<'a> {
    /// 선언된 크기와 메모리 임계값으로 바이트 소스를 생성합니다.
    ///
    /// 이 시점에는 `source`를 읽지 않습니다.
    pub fn new(source: &'a mut dyn Read, size: u64, threshold: u64) -> Self {
        Self {
            source: Some(source),
            size,
            threshold,
            state: State::Pending,
        }
    }

    /// 엔트리 헤더에 선언된 크기
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 내용을 처음부터 읽는 리더를 엽니다.
    ///
    /// 여러 번 호출할 수 있습니다. 첫 호출에서 읽기가 실패하면 이후 호출도
    /// 같은 종류의 에러를 반환합니다.
    pub fn open(&mut self) -> io::Result<CachedReader<'_>> {
        if matches!(self.state, State::Pending) {
            self.state = self.materialize();
        }

        match &self.state {
            State::Memory(buf) => Ok(CachedReader::Memory(Cursor::new(buf.as_slice()))),
            State::Spilled(tmp) => Ok(CachedReader::File(tmp.reopen()?)),
            State::Failed { kind, message } => Err(io::Error::new(*kind, message.clone())),
            State::Pending => Err(io::Error::other("entry content was not materialized")),
        }
    }

    /// 내용이 임시 파일로 내려쓰였다면 그 경로
    pub fn spilled_path(&self) -> Option<&Path> {
        match &self.state {
            State::Spilled(tmp) => Some(tmp.path()),
            _ => None,
        }
    }

    /// 보관 자원을 해제합니다.
    ///
    /// 임시 파일 삭제 실패는 경고 로그만 남깁니다.
    pub fn clean(self) {
        if let State::Spilled(tmp) = self.state {
            let path = tmp.path().to_path_buf();
            if let Err(e) = tmp.close() {
                warn!(path = %path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }

    fn materialize(&mut self) -> State {
        let Some(source) = self.source.take() else {
            return State::Failed {
                kind: io::ErrorKind::Other,
                message: "entry source already consumed".to_owned(),
            };
        };

        let result = if self.size <= self.threshold {
            read_to_memory(source, self.size)
        } else {
            spill_to_file(source)
        };

        result.unwrap_or_else(|e| State::Failed {
            kind: e.kind(),
            message: e.to_string(),
        })
    }
}

fn read_to_memory(source: &mut dyn Read, size: u64) -> io::Result<State> {
    let mut buf = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
    source.read_to_end(&mut buf)?;
    Ok(State::Memory(buf))
}

fn spill_to_file(source: &mut dyn Read) -> io::Result<State> {
    let mut tmp = tempfile::Builder::new().prefix("strata-").tempfile()?;
    let copied = io::copy(source, tmp.as_file_mut())?;
    trace!(path = %tmp.path().display(), bytes = copied, "spilled entry to temporary file");
    counter!(m::WALKER_SPILLED_FILES_TOTAL).increment(1);
    Ok(State::Spilled(tmp))
}

/// [`CachedFile::open`]이 반환하는 리더
pub enum CachedReader<'f> {
    /// 메모리 버퍼
    Memory(Cursor<&'f [u8]>),
    /// 임시 파일
    File(std::fs::File),
}

impl Read for CachedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::File(file) => file.read(buf),
        }
    }
}

impl Seek for CachedReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::File(file) => file.seek(pos),
        }
    }
}
