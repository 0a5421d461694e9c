use crate::errors::{Error, Result};
use serde_json::Value;

/// A positional view over a JSON-array request body.
///
/// Built from a request whose content type is `application/json` and whose
/// body is a JSON array, e.g. the body produced by
/// [`Call::with_args`](crate::client::Call::with_args). Arguments are
/// accessed by index rather than by name, mirroring how positional call
/// arguments are passed on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    args: Vec<Value>,
}

impl Form {
    /// Parses a `Form` out of the given content type and body.
    ///
    /// Returns [`Error::UnsupportedContentType`] if `content_type` is not
    /// `application/json`, and [`Error::Json`] if the body is not a valid
    /// JSON array.
    pub fn new(content_type: &str, body: &[u8]) -> Result<Self> {
        if content_type != "application/json" {
            return Err(Error::UnsupportedContentType(content_type.to_string()));
        }

        let args: Vec<Value> = serde_json::from_slice(body)?;

        Ok(Self { args })
    }

    /// Returns the argument at the given index.
    ///
    /// Panics if `index` is out of bounds, mirroring direct indexing into a
    /// fixed-shape positional argument list agreed upon by caller and
    /// handler.
    pub fn arg(&self, index: usize) -> Argument<'_> {
        Argument(&self.args[index])
    }

    /// Returns the number of positional arguments in this form.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Reports whether this form carries no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// A single positional argument, with fallible conversions to common types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Argument<'a>(&'a Value);

impl<'a> Argument<'a> {
    /// Converts the argument to a `String`.
    pub fn as_string(&self) -> Result<String> {
        self.0
            .as_str()
            .map(str::to_string)
            .ok_or(Error::TypeCast)
    }

    /// Converts the argument to an `i64`.
    pub fn as_i64(&self) -> Result<i64> {
        self.0.as_i64().ok_or(Error::TypeCast)
    }

    /// Converts the argument to an `f64`.
    pub fn as_f64(&self) -> Result<f64> {
        self.0.as_f64().ok_or(Error::TypeCast)
    }

    /// Converts the argument to a `bool`.
    pub fn as_bool(&self) -> Result<bool> {
        self.0.as_bool().ok_or(Error::TypeCast)
    }

    /// Returns the argument as a raw JSON [`Value`].
    pub fn raw(&self) -> &Value {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_positional_arguments() {
        let form = Form::new("application/json", br#"["hello", 42, true]"#).unwrap();

        assert_eq!(form.len(), 3);
        assert_eq!(form.arg(0).as_string().unwrap(), "hello");
        assert_eq!(form.arg(1).as_i64().unwrap(), 42);
        assert_eq!(form.arg(2).as_bool().unwrap(), true);
    }

    #[test]
    fn rejects_non_json_content_type() {
        let result = Form::new("text/plain", b"[]");

        assert!(matches!(result, Err(Error::UnsupportedContentType(_))));
    }

    #[test]
    fn type_mismatch_is_a_cast_error() {
        let form = Form::new("application/json", br#"["not a number"]"#).unwrap();

        assert!(matches!(form.arg(0).as_i64(), Err(Error::TypeCast)));
    }
}
