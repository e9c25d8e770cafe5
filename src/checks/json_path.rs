//! Dot-path lookup into a parsed JSON document.

use serde_json::Value;

/// Resolves a dot-separated path against a JSON value. Numeric segments
/// index into arrays; all other segments are object keys. Returns `None`
/// as soon as any segment fails to resolve.
pub(crate) fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn resolves_nested_object_keys() {
        let doc = json!({"status": {"db": "up"}});
        assert_eq!(resolve(&doc, "status.db"), Some(&json!("up")));
    }

    #[test]
    fn resolves_array_indices() {
        let doc = json!({"nodes": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(resolve(&doc, "nodes.1.name"), Some(&json!("b")));
    }

    #[test]
    fn missing_key_is_none() {
        let doc = json!({"status": "up"});
        assert_eq!(resolve(&doc, "health"), None);
        assert_eq!(resolve(&doc, "status.deeper"), None);
    }

    #[test]
    fn non_numeric_segment_on_array_is_none() {
        let doc = json!([1, 2, 3]);
        assert_eq!(resolve(&doc, "first"), None);
        assert_eq!(resolve(&doc, "0"), Some(&json!(1)));
    }
}
