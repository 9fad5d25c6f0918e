//! vigil-core
//!
//! Client-side driver for long-running remote operations: submit a job,
//! poll it with exponential backoff, and hand the outcome to whoever waits.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, operation, errors）
//! - **ports**: 抽象化レイヤー（OperationApi, DeliveryNotifier, Clock, Credential）
//! - **poller**: ポーリングループ本体（Poller, Awaiter, BackoffPolicy）
//! - **registry**: 実行中 Awaiter の登録簿（猶予期間つきの削除）
//! - **client**: document-analysis クライアント（ClientBuilder, delivery mode）
//! - **impls**: 実装（HTTP、開発・テスト用の台本 API）
//! - **config**: 設定ファイルと環境変数の読み込み

pub mod client;
pub mod config;
pub mod domain;
pub mod impls;
pub mod poller;
pub mod ports;
pub mod registry;

pub use client::{AnalyzeOptions, BuildError, ClientBuilder, DocumentAnalysisClient};
pub use domain::{
    ApiError, CancelReason, ErrorModel, Operation, OperationId, OperationStatus, Payload,
    PollPayload, PollerError,
};
pub use poller::{Awaiter, BackoffPolicy, Poller, RunOptions};
pub use registry::AwaiterRegistry;

// callback URLs and endpoints are plain reqwest URLs
pub use reqwest::Url;
