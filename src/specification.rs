use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every reference string emitted into the document
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Complete Swagger 2.0 document
///
/// Top-level key order is fixed (`swagger`, `info`, `host`, `schemes`,
/// `definitions`, `paths`) so serialized output diffs cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwaggerSpec {
    /// Specification version, always "2.0"
    pub swagger: String,

    /// API metadata
    pub info: ApiInfo,

    /// Host (authority) of the API, derived from the base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Transfer schemes, derived from the base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemes: Option<Vec<String>>,

    /// Shared schema definitions. Names containing `/` are expanded into
    /// nested mapping groups, so values are either schema objects or
    /// nested groups of them.
    #[serde(default)]
    pub definitions: IndexMap<String, Value>,

    /// URL template to HTTP method to operation
    #[serde(default)]
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
}

/// API metadata information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    /// API title
    pub title: String,

    /// API description
    pub description: String,

    /// API version
    pub version: String,
}

/// One HTTP method on one URL path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation ID
    #[serde(rename = "operationId")]
    pub operation_id: String,

    /// Long description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Short summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Accepted request media types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Vec<String>>,

    /// Tags for grouping
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,

    /// Parameters, in stable order
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Status code to response object; always contains "200"
    #[serde(default)]
    pub responses: IndexMap<String, Value>,
}

/// One request input of an operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,

    /// Parameter location (query, path, formData, body)
    #[serde(rename = "in")]
    pub location: String,

    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Required flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Primitive type, for non-body parameters
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,

    /// Format specifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Enum values, for enum-typed non-body parameters
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,

    /// Items schema, for array-typed non-body parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Schema, for body parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// A schema fragment: either a `$ref` or a structural description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a shared definition
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Data type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    /// Format specifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Enum values
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,

    /// Items schema for arrays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Properties for object types
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub properties: IndexMap<String, Schema>,

    /// Value schema for map-like objects
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,

    /// Required marker: a boolean flag in property position, a list of
    /// mandatory property names in object position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Required>,
}

/// The two spellings of `required` in Swagger 2.0 schema fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Required {
    /// Boolean flag on an individual property
    Flag(bool),
    /// List of mandatory property names on an object
    Names(Vec<String>),
}

impl Schema {
    /// A bare `$ref` fragment pointing at a shared definition
    pub fn reference_to(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", DEFINITIONS_PREFIX, name)),
            ..Default::default()
        }
    }

    /// A bare typed fragment
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    /// The definition name this fragment references, if it is a `$ref`
    pub fn ref_target(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(DEFINITIONS_PREFIX))
    }

    /// Whether this fragment is a bare `$ref`
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

impl SwaggerSpec {
    /// Create a new, empty specification
    pub fn new(info: ApiInfo) -> Self {
        Self {
            swagger: "2.0".to_string(),
            info,
            host: None,
            schemes: None,
            definitions: IndexMap::new(),
            paths: IndexMap::new(),
        }
    }
}
