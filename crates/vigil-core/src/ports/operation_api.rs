//! OperationApi port - リモート操作の submit / poll
//!
//! コアが外部サービスに要求するのはこの 2 つの呼び出しだけです。
//! エンドポイント、ヘッダ、ボディの形式は実装側（impls）が持ちます。
//!
//! # 実装
//! - **HttpOperations**: document-analysis サービス向け（reqwest）
//! - **ScriptedOperationApi**: 開発・テスト用（応答列を順に返す）

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ApiError, OperationId, Payload, PollPayload};

/// Result of the initiating call.
///
/// The id is optional on purpose: a transport-level success without an id is
/// a submission failure, and deciding that is the driver's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResponse {
    pub operation_id: Option<String>,
}

impl SubmitResponse {
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            operation_id: Some(id.into()),
        }
    }

    pub fn without_id() -> Self {
        Self { operation_id: None }
    }
}

/// OperationApi は 1 種類のリモート操作を開始・観測する
///
/// # 設計原則
/// - 1 回の `submit` につき 1 回だけ外向きのリクエストを出す
/// - `poll` は「今の状態」を返すだけ（リトライ判断はしない）
/// - `Send + Sync` を要求（バックグラウンドタスクから呼ばれる）
#[async_trait]
pub trait OperationApi: Send + Sync {
    async fn submit(&self, payload: &Payload) -> Result<SubmitResponse, ApiError>;

    async fn poll(&self, id: &OperationId) -> Result<PollPayload, ApiError>;
}

/// Hands out an [`OperationApi`] per analysis model.
///
/// The driver only knows `poll(id)`; which model an id belongs to is fixed
/// when the api is handed out.
pub trait OperationSource: Send + Sync {
    fn operations(&self, model: &str) -> Arc<dyn OperationApi>;
}

/// A single api serves every model (tests, scripted dev runs).
impl<A: OperationApi + 'static> OperationSource for Arc<A> {
    fn operations(&self, _model: &str) -> Arc<dyn OperationApi> {
        self.clone()
    }
}
