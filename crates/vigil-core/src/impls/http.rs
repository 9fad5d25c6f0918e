//! HTTP 実装 - document-analysis サービス向けの OperationApi / DeliveryNotifier
//!
//! # エンドポイント
//! - submit: `POST {endpoint}documentintelligence/documentModels/{model}:analyze?api-version=..`
//! - poll:   `GET  {endpoint}documentintelligence/documentModels/{model}/analyzeResults/{id}?api-version=..`
//! - notify: `POST {callback_url}`（`Request-ID` ヘッダ付き）
//!
//! 操作 ID は submit レスポンスの `apim-request-id` ヘッダから取り出します。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use tracing::debug;

use crate::domain::{ApiError, Operation, OperationId, Payload, PollPayload};
use crate::ports::{
    Credential, DeliveryNotifier, OperationApi, OperationSource, SubmitResponse,
};

/// Service API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2022-08-31";

/// Default timeout for a single HTTP call.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const REQUEST_ID_HEADER: &str = "apim-request-id";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";
const CALLBACK_REQUEST_ID_HEADER: &str = "Request-ID";

/// Shared HTTP state for one service endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_version: String,
    credential: Arc<dyn Credential>,
}

impl HttpTransport {
    pub fn new(
        endpoint: &Url,
        api_version: impl Into<String>,
        credential: Arc<dyn Credential>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, endpoint, api_version, credential))
    }

    pub fn with_client(
        client: Client,
        endpoint: &Url,
        api_version: impl Into<String>,
        credential: Arc<dyn Credential>,
    ) -> Self {
        Self {
            client,
            endpoint: normalize_endpoint(endpoint),
            api_version: api_version.into(),
            credential,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Submit/poll calls bound to one analysis model.
    pub fn operations(&self, model: &str) -> HttpOperations {
        HttpOperations {
            transport: self.clone(),
            model: model.to_string(),
        }
    }
}

impl OperationSource for HttpTransport {
    fn operations(&self, model: &str) -> Arc<dyn OperationApi> {
        Arc::new(HttpTransport::operations(self, model))
    }
}

/// [`OperationApi`] for a single model of the document-analysis service.
#[derive(Clone)]
pub struct HttpOperations {
    transport: HttpTransport,
    model: String,
}

impl HttpOperations {
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl OperationApi for HttpOperations {
    async fn submit(&self, payload: &Payload) -> Result<SubmitResponse, ApiError> {
        let t = &self.transport;
        let url = analyze_url(&t.endpoint, &self.model, &t.api_version);

        let response = t
            .client
            .post(&url)
            .header(CONTENT_TYPE, payload.content_type())
            .header(SUBSCRIPTION_KEY_HEADER, t.credential.to_string())
            .body(payload.clone().into_body())
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let operation_id = header_value(&response, REQUEST_ID_HEADER).or_else(|| {
            header_value(&response, OPERATION_LOCATION_HEADER)
                .as_deref()
                .and_then(id_from_operation_location)
        });
        debug!(model = %self.model, operation_id = ?operation_id, "analyze request accepted");

        Ok(SubmitResponse { operation_id })
    }

    async fn poll(&self, id: &OperationId) -> Result<PollPayload, ApiError> {
        let t = &self.transport;
        let url = results_url(&t.endpoint, &self.model, id, &t.api_version);

        let response = t
            .client
            .get(&url)
            .header(SUBSCRIPTION_KEY_HEADER, t.credential.to_string())
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Delivers terminal operations as JSON `POST`s.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeliveryNotifier for HttpNotifier {
    async fn notify(&self, url: &Url, operation: &Operation) -> Result<(), ApiError> {
        let body = serde_json::to_vec(operation)?;
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(CALLBACK_REQUEST_ID_HEADER, operation.id.as_str())
            .body(body)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(ApiError::Status {
        status: response.status().as_u16(),
        message: response.text().await.unwrap_or_default(),
    })
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_endpoint(endpoint: &Url) -> String {
    let mut endpoint = endpoint.as_str().to_string();
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint
}

fn analyze_url(endpoint: &str, model: &str, api_version: &str) -> String {
    format!("{endpoint}documentintelligence/documentModels/{model}:analyze?api-version={api_version}")
}

fn results_url(endpoint: &str, model: &str, id: &OperationId, api_version: &str) -> String {
    format!(
        "{endpoint}documentintelligence/documentModels/{model}/analyzeResults/{id}?api-version={api_version}"
    )
}

/// `.../analyzeResults/{id}?api-version=..` -> `{id}`
fn id_from_operation_location(location: &str) -> Option<String> {
    let path = location.split('?').next()?;
    let id = path.trim_end_matches('/').rsplit('/').next()?;
    (!id.is_empty()).then(|| id.to_string())
}
