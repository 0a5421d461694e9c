use serde::Serialize;

/// The kind of a single field in a [`MethodSpec`]'s body description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A string value.
    String,
    /// An integer value.
    Integer,
    /// A floating-point value.
    Float,
    /// A boolean value.
    Boolean,
    /// A nested object, described by [`FieldSpec::nested`].
    Object,
    /// An array of values.
    Array,
}

/// Describes a single field of a method's request or response body.
///
/// This is the explicit, hand-built replacement for the reflection-based
/// spec generation a runtime-reflective language would derive automatically
/// from a handler's input struct (see `SPEC_FULL.md` §4.8): since Rust has no
/// equivalent runtime reflection, callers who want their method published to
/// the spec catalog build this tree once, by hand, at registration time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    description: String,
    nested: Vec<FieldSpec>,
}

impl FieldSpec {
    /// Creates a new, leaf [`FieldSpec`] with no nested fields.
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            nested: Vec::new(),
        }
    }

    /// Attaches nested fields, turning this into an [`FieldKind::Object`]-shaped
    /// description.
    pub fn with_nested(mut self, nested: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.nested = nested.into_iter().collect();
        self
    }

    /// The field's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's declared kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// A human-readable description of the field.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The nested fields, if this field describes an object.
    pub fn nested(&self) -> &[FieldSpec] {
        &self.nested
    }
}

/// The structural description of a single method's request and/or response
/// body, published to the `porthos.specs` queue by the built-in spec-shipper
/// extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodSpec {
    fields: Vec<FieldSpec>,
}

impl MethodSpec {
    /// Creates a new spec out of its top-level fields.
    pub fn new(fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// The top-level fields of this spec.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_stable_spec_for_the_same_handler() {
        fn build() -> MethodSpec {
            MethodSpec::new([
                FieldSpec::new("value", FieldKind::Integer, "the input value"),
                FieldSpec::new("nested", FieldKind::Object, "a nested object").with_nested([
                    FieldSpec::new("inner", FieldKind::String, "an inner string"),
                ]),
            ])
        }

        assert_eq!(build(), build());
    }
}
