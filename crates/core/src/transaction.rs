//! Opaque transaction records.
//!
//! The ledger never interprets a record's contents. A record is a flat map
//! from field name to a scalar value; it only has to be hashable and
//! JSON-serializable.

use crate::hash::{hash_canonical, Hash};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Iter};

/// A scalar field value inside a transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Integer)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// An opaque transaction record awaiting, or sealed into, a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction {
    fields: BTreeMap<String, FieldValue>,
}

impl Transaction {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a field, returning the previous value if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Get a field by name.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    /// Digest of the record's canonical JSON encoding.
    pub fn hash(&self) -> Hash {
        hash_canonical(self).expect("serialization should not fail")
    }
}

impl FromIterator<(String, FieldValue)> for Transaction {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let tx = Transaction::new()
            .with("patient", "Zoë")
            .with("age", 42i64)
            .with("covid", false);

        assert_eq!(tx.len(), 3);
        assert_eq!(tx.get("age"), Some(&FieldValue::Integer(42)));
        assert_eq!(tx.get("missing"), None);
    }

    #[test]
    fn test_deserialize_scalar_variants() {
        let tx: Transaction = serde_json::from_str(
            r#"{"s": "text", "i": 7, "f": 36.6, "b": true, "n": null}"#,
        )
        .unwrap();

        assert_eq!(tx.get("s"), Some(&FieldValue::Text("text".into())));
        assert_eq!(tx.get("i"), Some(&FieldValue::Integer(7)));
        assert_eq!(tx.get("f"), Some(&FieldValue::Float(36.6)));
        assert_eq!(tx.get("b"), Some(&FieldValue::Bool(true)));
        assert_eq!(tx.get("n"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_large_integers_stay_exact() {
        let body = r#"{"id": 9223372036854775808, "max": 18446744073709551615, "small": 5}"#;
        let tx: Transaction = serde_json::from_str(body).unwrap();

        assert_eq!(tx.get("id"), Some(&FieldValue::UInt(9223372036854775808)));
        assert_eq!(tx.get("max"), Some(&FieldValue::UInt(u64::MAX)));
        assert_eq!(tx.get("small"), Some(&FieldValue::Integer(5)));
        assert_eq!(
            serde_json::to_string(&tx).unwrap(),
            r#"{"id":9223372036854775808,"max":18446744073709551615,"small":5}"#
        );
        assert_eq!(FieldValue::from(5u64), FieldValue::Integer(5));
    }

    #[test]
    fn test_nested_values_rejected() {
        assert!(serde_json::from_str::<Transaction>(r#"{"a": {"b": 1}}"#).is_err());
        assert!(serde_json::from_str::<Transaction>(r#"{"a": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<Transaction>(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let tx = Transaction::new().with("b", 1i64).with("a", Option::<&str>::None);
        assert_eq!(serde_json::to_string(&tx).unwrap(), r#"{"a":null,"b":1}"#);
    }

    #[test]
    fn test_hash_ignores_insertion_order() {
        let a = Transaction::new().with("x", 1i64).with("y", "two");
        let b = Transaction::new().with("y", "two").with("x", 1i64);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = Transaction::new().with("x", 1i64);
        let b = Transaction::new().with("x", 2i64);
        assert_ne!(a.hash(), b.hash());
    }
}
