//! Request DTOs for the store server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

/// Request body for the SET operation (POST /set)
///
/// # Fields
/// - `key`: The key to store the value under
/// - `value`: The value to store
/// - `ttl`: Optional TTL in seconds (entries without one never expire)
/// - `namespace`: Optional namespace; the `ns` query parameter wins when
///   both are given
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Optional namespace
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Query-string namespace selector shared by most endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NsQuery {
    /// Namespace to operate in; absent means the default namespace
    #[serde(default)]
    pub ns: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, "hello");
        assert!(req.ttl.is_none());
        assert!(req.namespace.is_none());
    }

    #[test]
    fn test_set_request_with_ttl_and_namespace() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60, "namespace": "t1"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
        assert_eq!(req.namespace.as_deref(), Some("t1"));
    }

    #[test]
    fn test_negative_ttl_is_rejected_at_parse_time() {
        let json = r#"{"key": "test", "value": "hello", "ttl": -5}"#;
        assert!(serde_json::from_str::<SetRequest>(json).is_err());
    }
}
