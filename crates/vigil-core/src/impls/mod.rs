//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **HttpTransport / HttpOperations**: document-analysis サービス向け（reqwest）
//! - **HttpNotifier**: delivery mode のコールバック送信
//! - **ScriptedOperationApi**: 開発・テスト用（台本どおりに応答）
//! - **RecordingNotifier**: 開発・テスト用（送信内容を記録）

pub mod http;
pub mod scripted;

// 主要な型を再エクスポート
pub use self::http::{DEFAULT_API_VERSION, HttpNotifier, HttpOperations, HttpTransport};
pub use self::scripted::{RecordingNotifier, ScriptedOperationApi};
