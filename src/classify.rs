use crate::fields::FieldKind;

/// Type tag a field node maps to on the Swagger side
///
/// `Enum` and `Ref` are kept as distinct tags even though Swagger itself
/// types enums as their underlying primitive and spells references with
/// `$ref`; the converter unifies those at its single emission points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwaggerType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Enum,
    Ref,
}

impl SwaggerType {
    /// The `type` string Swagger expects for this tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Enum => "enum",
            Self::Ref => "ref",
        }
    }

    /// Whether the tag describes a composite shape
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

/// Map a field kind to its Swagger type tag
///
/// Total over the closed kind set; map-like shapes classify as objects.
/// New kinds extend the enum and this match, never open-ended type tests.
pub fn classify(kind: &FieldKind) -> SwaggerType {
    match kind {
        FieldKind::String => SwaggerType::String,
        FieldKind::Integer => SwaggerType::Integer,
        FieldKind::Number => SwaggerType::Number,
        FieldKind::Boolean => SwaggerType::Boolean,
        FieldKind::Array { .. } => SwaggerType::Array,
        FieldKind::Object { .. } | FieldKind::Map { .. } => SwaggerType::Object,
        FieldKind::Enum { .. } => SwaggerType::Enum,
        FieldKind::Reference { .. } => SwaggerType::Ref,
    }
}
