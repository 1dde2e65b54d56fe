pub mod http;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Response envelope of every backend route.
///
/// `success` is `None` when the key is absent and `Some(None)` for an explicit
/// `null`, which is reserved for "the session is no longer valid".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub success: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: Some(Some(false)),
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn session_expired() -> Self {
        Self {
            success: Some(None),
            ..Self::default()
        }
    }
}

/// Only called for keys that are present, so `null` becomes `Some(None)`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Some)
}

/// The single network call every orchestration sequence goes through.
///
/// `Err` means the request never produced a recognizable envelope.
pub trait Backend: Sync {
    fn call(
        &self,
        route: &str,
        method: Method,
        body: Option<Value>,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Envelope>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_null_success() {
        let env: Envelope = serde_json::from_str(r#"{ "success": null }"#).unwrap();
        assert_eq!(env, Envelope::session_expired());
    }

    #[test]
    fn missing_success_is_not_null() {
        let env: Envelope = serde_json::from_str(r#"{ "data": { "product": {} } }"#).unwrap();
        assert_eq!(env.success, None);
        assert_ne!(env, Envelope::session_expired());
    }

    #[test]
    fn null_success_serializes_as_null() {
        let json = serde_json::to_value(Envelope::session_expired()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": null }));
    }

    #[test]
    fn deserialize_embedded_error() {
        let env: Envelope =
            serde_json::from_str(r#"{ "success": true, "data": { "error": "No account" } }"#)
                .unwrap();
        assert_eq!(env.success, Some(Some(true)));
        assert_eq!(env.data.unwrap()["error"], "No account");
    }
}
