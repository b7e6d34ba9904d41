//! 주입 가능한 시계
//!
//! EOL(지원 종료) 판정은 시스템 시계를 직접 읽지 않고 [`Clock`]을 통해
//! 현재 시각을 얻습니다. 테스트는 [`FixedClock`]으로 경계 직전/직후 시각을
//! 재현할 수 있습니다.

use chrono::{DateTime, Utc};

/// 현재 시각을 제공하는 trait
pub trait Clock: Send + Sync {
    /// 현재 시각 (UTC)
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 고정된 시각을 반환하는 시계
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    /// 주어진 시각에 고정된 시계를 생성합니다.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
