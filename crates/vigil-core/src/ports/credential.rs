//! Credential port - 認証情報のキャリア
//!
//! コアは中身を一切見ません。HTTP 実装が `to_string()` で 1 本のトークンに
//! 描画してヘッダに載せるだけです。

use std::fmt;

/// How a credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Default,
    Key,
}

/// Opaque capability rendered to a single token via `Display`.
pub trait Credential: fmt::Display + Send + Sync {
    fn kind(&self) -> CredentialKind;
}

/// Subscription-key credential.
#[derive(Clone)]
pub struct KeyCredential {
    key: String,
}

impl KeyCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Credential for KeyCredential {
    fn kind(&self) -> CredentialKind {
        CredentialKind::Key
    }
}

impl fmt::Display for KeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

// keep keys out of logs
impl fmt::Debug for KeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCredential")
            .field("key", &"<redacted>")
            .finish()
    }
}
