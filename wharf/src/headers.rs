use serde_json::Value;
use std::collections::BTreeMap;

/// RPC headers attached to a [`Request`](crate::Request) or
/// [`Response`](crate::Response).
///
/// Backed by a `BTreeMap` rather than a `HashMap` so that iteration order
/// (and therefore wire encoding) is deterministic, which matters since the
/// server's response writer sets the `statusCode` header alongside whatever
/// headers the handler itself set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    values: BTreeMap<String, Value>,
}

impl Headers {
    /// Creates an empty set of headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, overwriting any previous value under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a header, if set.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Removes a header, returning its previous value if any.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Exposes the headers as a plain map, e.g. to hand to an AMQP
    /// `FieldTable` builder.
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl FromIterator<(String, Value)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_get_delete() {
        let mut headers = Headers::new();
        headers.set("statusCode", 200);

        assert_eq!(headers.get("statusCode"), Some(&Value::from(200)));
        assert_eq!(headers.delete("statusCode"), Some(Value::from(200)));
        assert_eq!(headers.get("statusCode"), None);
    }

    #[test]
    fn overwrites_existing_key() {
        let mut headers = Headers::new();
        headers.set("X-Method", "addOne");
        headers.set("X-Method", "addTwo");

        assert_eq!(headers.get("X-Method"), Some(&Value::from("addTwo")));
    }
}
