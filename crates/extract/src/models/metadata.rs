use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Deref;

/// Embedded metadata of a single image, keyed by snake_case field name.
///
/// Serializes as a flat JSON object; keys are kept sorted so the stored
/// representation of the same image is always byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, keeping the first value seen for a duplicated key.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> bool {
        let mut inserted = false;
        self.0.entry(field.into()).or_insert_with(|| {
            inserted = true;
            value.into()
        });
        inserted
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl Deref for Metadata {
    type Target = BTreeMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (field, value) in iter {
            metadata.insert(field, value);
        }
        metadata
    }
}

impl IntoIterator for Metadata {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_flat_sorted_object() {
        let metadata: Metadata = [("orientation", json!(1)), ("make", json!("Canon"))].into_iter().collect();
        assert_eq!(serde_json::to_string(&metadata).unwrap(), r#"{"make":"Canon","orientation":1}"#);
    }

    #[test]
    fn test_first_value_wins() {
        let mut metadata = Metadata::new();
        assert!(metadata.insert("model", "EOS R5"));
        assert!(!metadata.insert("model", "thumbnail"));
        assert_eq!(metadata.get("model"), Some(&json!("EOS R5")));
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_deserializes_from_object() {
        let metadata: Metadata = serde_json::from_str(r#"{"x_resolution":72.0,"make":"Nikon"}"#).unwrap();
        assert_eq!(metadata.get("x_resolution"), Some(&json!(72.0)));
        assert_eq!(metadata.keys().collect::<Vec<_>>(), ["make", "x_resolution"]);
    }
}
