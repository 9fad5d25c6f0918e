//! ClientBuilder - クライアントの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ports の差し替え（テストでは ScriptedOperationApi / FixedClock を注入）

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

use super::DocumentAnalysisClient;
use crate::domain::ApiError;
use crate::impls::{DEFAULT_API_VERSION, HttpNotifier, HttpTransport};
use crate::poller::BackoffPolicy;
use crate::ports::{Clock, Credential, DeliveryNotifier, OperationSource, SystemClock};
use crate::registry::{AwaiterRegistry, DEFAULT_GRACE_PERIOD};

/// ClientBuilder は DocumentAnalysisClient を構築
///
/// # 使用例
/// ```ignore
/// let client = ClientBuilder::new("https://my-resource.cognitiveservices.azure.com", credential)
///     .backoff(BackoffPolicy::new(Duration::from_millis(500)))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - endpoint が URL として読めなければ build() でエラー
/// - base_delay が 0 なら build() でエラー（ビジーループ防止）
pub struct ClientBuilder {
    endpoint: String,
    credential: Arc<dyn Credential>,
    api_version: String,
    backoff: BackoffPolicy,
    grace_period: Duration,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn DeliveryNotifier>>,
    registry: Option<AwaiterRegistry>,
    transport: Option<Arc<dyn OperationSource>>,
}

/// BuildError はクライアント構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("backoff base delay must be greater than zero")]
    ZeroBaseDelay,

    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] ApiError),
}

impl ClientBuilder {
    pub fn new(endpoint: impl Into<String>, credential: Arc<dyn Credential>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            api_version: DEFAULT_API_VERSION.to_string(),
            backoff: BackoffPolicy::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            clock: None,
            notifier: None,
            registry: None,
            transport: None,
        }
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Ignored when an explicit registry is supplied.
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn DeliveryNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Share a registry with other clients.
    pub fn registry(mut self, registry: AwaiterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the HTTP transport (scripted api in tests and demos).
    pub fn transport(mut self, source: impl OperationSource + 'static) -> Self {
        self.transport = Some(Arc::new(source));
        self
    }

    /// 検証してクライアントを生成
    pub fn build(self) -> Result<DocumentAnalysisClient, BuildError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| BuildError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if self.backoff.base_delay.is_zero() {
            return Err(BuildError::ZeroBaseDelay);
        }

        let source: Arc<dyn OperationSource> = match self.transport {
            Some(source) => source,
            None => Arc::new(HttpTransport::new(
                &endpoint,
                self.api_version,
                self.credential,
            )?),
        };
        let notifier: Arc<dyn DeliveryNotifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(HttpNotifier::new()?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let registry = self
            .registry
            .unwrap_or_else(|| AwaiterRegistry::with_grace_period(self.grace_period));

        Ok(DocumentAnalysisClient::from_parts(
            endpoint,
            source,
            clock,
            notifier,
            registry,
            self.backoff,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::ScriptedOperationApi;
    use crate::ports::KeyCredential;

    fn builder(endpoint: &str) -> ClientBuilder {
        ClientBuilder::new(endpoint, Arc::new(KeyCredential::new("k")))
    }

    #[test]
    fn test_build_with_http_defaults() {
        let client = builder("https://x.example.com").build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_invalid_endpoint() {
        let client = builder("not a url").build();
        assert!(matches!(
            client,
            Err(BuildError::InvalidEndpoint { endpoint, .. }) if endpoint == "not a url"
        ));
    }

    #[test]
    fn test_build_zero_base_delay() {
        let client = builder("https://x.example.com")
            .backoff(BackoffPolicy::new(Duration::ZERO))
            .build();
        assert!(matches!(client, Err(BuildError::ZeroBaseDelay)));
    }

    #[test]
    fn test_grace_period_applies_to_owned_registry() {
        let client = builder("https://x.example.com")
            .transport(Arc::new(ScriptedOperationApi::new("abc123")))
            .grace_period(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.registry().grace_period(), Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_registry_is_shared() {
        let registry = AwaiterRegistry::with_grace_period(Duration::from_secs(7));
        let client = builder("https://x.example.com")
            .transport(Arc::new(ScriptedOperationApi::new("abc123")))
            .registry(registry.clone())
            .grace_period(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.registry().grace_period(), Duration::from_secs(7));
    }
}
