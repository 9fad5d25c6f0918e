//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! ポーラーが外の世界に触れるのはここに並ぶ trait 経由だけです。
//!
//! # 設計原則
//! - リクエストの組み立て・レスポンスの解釈は実装側（impls）の責務
//! - 時刻と待ち時間も Clock として注入する（テストで差し替え可能）

pub mod clock;
pub mod credential;
pub mod notifier;
pub mod operation_api;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::credential::{Credential, CredentialKind, KeyCredential};
pub use self::notifier::DeliveryNotifier;
pub use self::operation_api::{OperationApi, OperationSource, SubmitResponse};
