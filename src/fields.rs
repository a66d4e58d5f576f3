/*!
Normalized input model for Swagger document generation.

The generator does not introspect a web framework itself; the framework side
materializes an [`ApiDescription`] (links with fields and nested data shapes)
and hands it over. Everything here is immutable once built: conversion only
reads this graph.
*/

use indexmap::IndexMap;

/// One typed data shape in the input graph
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    /// Concrete kind of the shape
    pub kind: FieldKind,
    /// Human-readable title
    pub title: String,
    /// Human-readable description
    pub description: String,
    /// Whether the value is mandatory where it appears
    pub required: bool,
    /// Identity of the originating shape-class (e.g. a serializer's
    /// qualified name); candidate name for a shared definition
    pub source_identity: Option<String>,
    /// Optional string format annotation (`date`, `date-time`, ...)
    pub format: Option<String>,
}

/// Closed set of shape kinds
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Homogeneous sequence
    Array { items: Box<FieldNode> },
    /// Fixed set of named properties
    Object {
        properties: IndexMap<String, FieldNode>,
        required: Vec<String>,
    },
    /// Fixed set of string values
    Enum { values: Vec<String> },
    /// Dict-like shape with a uniform value type
    Map { values: Box<FieldNode> },
    /// Reference to a named shape registered elsewhere
    Reference { target: String },
}

impl FieldNode {
    /// Create a new node of the given kind
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            title: String::new(),
            description: String::new(),
            required: true,
            source_identity: None,
            format: None,
        }
    }

    /// Shorthand for a string node
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    /// Shorthand for an integer node
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    /// Shorthand for a number node
    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    /// Shorthand for a boolean node
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Shorthand for an array node
    pub fn array(items: FieldNode) -> Self {
        Self::new(FieldKind::Array {
            items: Box::new(items),
        })
    }

    /// Shorthand for an object node
    pub fn object(properties: IndexMap<String, FieldNode>, required: Vec<String>) -> Self {
        Self::new(FieldKind::Object {
            properties,
            required,
        })
    }

    /// Shorthand for an enum node
    pub fn enumeration(values: Vec<String>) -> Self {
        Self::new(FieldKind::Enum { values })
    }

    /// Shorthand for a map node with a uniform value type
    pub fn map(values: FieldNode) -> Self {
        Self::new(FieldKind::Map {
            values: Box::new(values),
        })
    }

    /// Shorthand for a reference node
    pub fn reference(target: &str) -> Self {
        Self::new(FieldKind::Reference {
            target: target.to_string(),
        })
    }

    /// Set the title
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Mark the node as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the originating shape-class identity
    pub fn with_identity(mut self, identity: &str) -> Self {
        self.source_identity = Some(identity.to_string());
        self
    }

    /// Set the string format annotation
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }
}

/// Where a request input travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    Path,
    Query,
    Form,
    Body,
}

impl FieldLocation {
    /// The `in` value Swagger expects for this location
    pub fn as_swagger(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            // Swagger spells form-encoded inputs "formData"
            Self::Form => "formData",
            Self::Body => "body",
        }
    }
}

/// One request input of a link
#[derive(Debug, Clone)]
pub struct LinkField {
    /// Field name
    pub name: String,
    /// Where the field travels
    pub location: FieldLocation,
    /// Whether the field must be supplied
    pub required: bool,
    /// The field's data shape
    pub schema: FieldNode,
}

impl LinkField {
    /// Create a new field
    pub fn new(name: &str, location: FieldLocation, schema: FieldNode) -> Self {
        Self {
            name: name.to_string(),
            location,
            required: true,
            schema,
        }
    }

    /// Mark the field optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// One endpoint: a URL template plus an HTTP method
#[derive(Debug, Clone)]
pub struct Link {
    /// URL template, possibly containing `{param}` segments
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Free-form endpoint description
    pub description: String,
    /// Request encoding (media type), if the endpoint takes a body
    pub encoding: Option<String>,
    /// Ordered request inputs
    pub fields: Vec<LinkField>,
    /// Precomputed success-response shape
    pub response: Option<FieldNode>,
    /// Declared error responses, status code to verbatim schema
    pub error_responses: IndexMap<String, serde_json::Value>,
}

impl Link {
    /// Create a new link
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_string(),
            description: String::new(),
            encoding: None,
            fields: Vec::new(),
            response: None,
            error_responses: IndexMap::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the request encoding
    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    /// Add a request field
    pub fn with_field(mut self, field: LinkField) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the success-response shape
    pub fn with_response(mut self, response: FieldNode) -> Self {
        self.response = Some(response);
        self
    }

    /// Add an error response entry, passed through verbatim
    pub fn with_error_response(mut self, status: &str, schema: serde_json::Value) -> Self {
        self.error_responses.insert(status.to_string(), schema);
        self
    }
}

/// One entry of the endpoint graph
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Unique operation identifier
    pub operation_id: String,
    /// The endpoint itself
    pub link: Link,
    /// Tags for grouping operations
    pub tags: Vec<String>,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(operation_id: &str, link: Link) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            link,
            tags: Vec::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }
}

/// The materialized API description handed over by framework introspection
#[derive(Debug, Clone, Default)]
pub struct ApiDescription {
    /// Endpoints in presentation order
    pub endpoints: Vec<Endpoint>,
}

impl ApiDescription {
    /// Create an empty description
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }
}
