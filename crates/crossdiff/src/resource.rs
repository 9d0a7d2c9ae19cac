//! Resource records as returned by fetchers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Resources of one service, keyed by resource type.
pub type ResourceMap = BTreeMap<String, Vec<Resource>>;

/// A single fetched resource.
///
/// The record is opaque to the engine: a tree of named fields whose shape is
/// defined by the service that produced it. A few well-known fields (`arn`,
/// `id`, `name`, `tags`) are read by identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Map<String, Value>);

impl Resource {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a resource from a JSON value; non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The record as a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Non-empty string value of a field.
    ///
    /// Numbers are rendered to strings so numeric ids still resolve.
    pub fn get_str(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn arn(&self) -> Option<String> {
        self.get_str("arn")
    }

    /// Look up a tag value.
    ///
    /// Accepts both an object (`{"Name": "web"}`) and the key/value list
    /// form (`[{"Key": "Name", "Value": "web"}]`), under `tags` or `Tags`.
    pub fn tag(&self, key: &str) -> Option<String> {
        let tags = self.0.get("tags").or_else(|| self.0.get("Tags"))?;
        let value = match tags {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.iter().find_map(|item| {
                let entry = item.as_object()?;
                let k = entry.get("Key").or_else(|| entry.get("key"))?;
                (k.as_str() == Some(key))
                    .then(|| entry.get("Value").or_else(|| entry.get("value")))
                    .flatten()
            })?,
            _ => return None,
        };
        value.as_str().filter(|s| !s.is_empty()).map(String::from)
    }
}

impl From<Map<String, Value>> for Resource {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Total number of resources across all types in a map.
pub fn count_resources(map: &ResourceMap) -> usize {
    map.values().map(Vec::len).sum()
}

#[cfg(test)]
pub(crate) fn resource(value: Value) -> Resource {
    Resource::from_value(value).expect("test resource must be an object")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_str_skips_empty() {
        let r = resource(json!({"name": "", "id": 42, "arn": "arn:aws:s3:::b"}));
        assert_eq!(r.get_str("name"), None);
        assert_eq!(r.get_str("id").as_deref(), Some("42"));
        assert_eq!(r.arn().as_deref(), Some("arn:aws:s3:::b"));
        assert_eq!(r.get_str("missing"), None);
    }

    #[test]
    fn test_tag_object_form() {
        let r = resource(json!({"tags": {"Name": "web-1", "env": "prod"}}));
        assert_eq!(r.tag("Name").as_deref(), Some("web-1"));
        assert_eq!(r.tag("owner"), None);
    }

    #[test]
    fn test_tag_list_form() {
        let r = resource(json!({"Tags": [
            {"Key": "env", "Value": "prod"},
            {"Key": "Name", "Value": "web-1"}
        ]}));
        assert_eq!(r.tag("Name").as_deref(), Some("web-1"));
        assert_eq!(r.tag("env").as_deref(), Some("prod"));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Resource::from_value(json!([1, 2])).is_none());
        assert!(Resource::from_value(json!("x")).is_none());
    }

    #[test]
    fn test_count_resources() {
        let mut map = ResourceMap::new();
        map.insert("a".into(), vec![Resource::default(), Resource::default()]);
        map.insert("b".into(), vec![Resource::default()]);
        assert_eq!(count_resources(&map), 3);
    }
}
