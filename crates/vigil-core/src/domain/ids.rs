//! Domain identifiers.
//!
//! # OperationId
//! Operation の id はリモートサービスが submit のレスポンスで払い出します。
//! こちら側では生成も解釈もせず、不透明な文字列としてそのまま運びます。
//!
//! ## なぜ newtype にするのか？
//! - モデル名や URL などの他の `String` と混同できない
//! - registry のキーとして `Hash + Eq` をそのまま使える

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a remote long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for OperationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_raw_remote_id() {
        let id = OperationId::new("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = OperationId::from("3f0e-9a");
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"3f0e-9a\"");

        let back: OperationId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }
}
