//! Wire format of a value-change notification

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ key, value, removed }` as posted on a namespace channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Logical key the change applies to
    pub key: String,

    /// New payload; `null` when removed
    pub value: Option<Value>,

    /// The key now holds no value
    pub removed: bool,
}

impl BroadcastMessage {
    /// Message announcing that `key` now holds `value` (absent when `None`)
    pub fn change(key: impl Into<String>, value: Option<Value>) -> Self {
        let removed = value.is_none();
        Self {
            key: key.into(),
            value,
            removed,
        }
    }

    /// Decode a received message. Anything without the expected shape is
    /// `None`.
    pub fn parse(raw: &Value) -> Option<Self> {
        Self::deserialize(raw).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "key": self.key,
            "value": self.value,
            "removed": self.removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_sets_removed() {
        let msg = BroadcastMessage::change("settings", None);
        assert!(msg.removed);
        assert_eq!(
            msg.to_value(),
            json!({"key": "settings", "value": null, "removed": true})
        );

        let msg = BroadcastMessage::change("settings", Some(json!({"fontSize": 20})));
        assert!(!msg.removed);
    }

    #[test]
    fn test_parse_tolerates_foreign_shapes() {
        assert_eq!(BroadcastMessage::parse(&json!("hello")), None);
        assert_eq!(BroadcastMessage::parse(&json!(null)), None);
        assert_eq!(BroadcastMessage::parse(&json!({"key": 1, "removed": false})), None);
        assert_eq!(BroadcastMessage::parse(&json!({"key": "k"})), None);
        assert_eq!(
            BroadcastMessage::parse(&json!({"key": "k", "removed": "yes"})),
            None
        );
    }

    #[test]
    fn test_parse_accepts_missing_value() {
        let msg = BroadcastMessage::parse(&json!({"key": "k", "removed": true, "extra": 1})).unwrap();
        assert_eq!(msg, BroadcastMessage::change("k", None));

        let msg = BroadcastMessage::parse(&json!({"key": "k", "value": [1], "removed": false})).unwrap();
        assert_eq!(msg.value, Some(json!([1])));
    }
}
