//! Clock port - 時刻とタイマーの抽象化
//!
//! # 実装
//! - **SystemClock**: 本番用（chrono + tokio::time）
//! - **FixedClock**: テスト用（時刻固定、sleep は記録だけして即座に戻る）

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Clock は現在時刻と「待つ」操作を提供
///
/// # テスト容易性
/// - ポーリングループは sleep をこの trait 経由でしか呼ばない
/// - テストでは FixedClock を使い、待ち時間の列をそのまま検証できる
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `chrono::Utc` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock frozen at one instant. `sleep` records the duration and returns
/// after a single yield.
#[derive(Debug)]
pub struct FixedClock {
    now: DateTime<Utc>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        tokio::task::yield_now().await;
    }
}
