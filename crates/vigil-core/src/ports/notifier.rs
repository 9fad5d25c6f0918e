//! DeliveryNotifier port - 完了結果のプッシュ配送
//!
//! delivery mode では、呼び出し元をブロックせずに終端の Operation を
//! コールバック URL へ送ります。
//!
//! # 実装
//! - **HttpNotifier**: JSON を POST（`Request-ID` ヘッダで相関）
//! - **RecordingNotifier**: 開発・テスト用（送信内容を記録するだけ）

use async_trait::async_trait;
use reqwest::Url;

use crate::domain::{ApiError, Operation};

/// DeliveryNotifier は終端の Operation を 1 回だけ送る
///
/// # 設計原則
/// - リトライしない（best-effort）
/// - 失敗は呼び出し側でログに残すだけで、元の呼び出し元には返らない
#[async_trait]
pub trait DeliveryNotifier: Send + Sync {
    async fn notify(&self, url: &Url, operation: &Operation) -> Result<(), ApiError>;
}
