/*!
Post-generation validation of Swagger documents.
*/

use serde_json::Value;

use crate::{
    error::SwaggerResult,
    specification::{Operation, Schema, SwaggerSpec, DEFINITIONS_PREFIX},
};

/// Utility functions for generated documents
pub struct SwaggerUtils;

impl SwaggerUtils {
    /// Validate a generated specification, producing leveled warnings
    pub fn validate_spec(spec: &SwaggerSpec) -> SwaggerResult<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        if spec.info.title.is_empty() {
            warnings.push(ValidationWarning::new(
                "info.title is required but empty",
                ValidationLevel::Error,
            ));
        }
        if spec.info.version.is_empty() {
            warnings.push(ValidationWarning::new(
                "info.version is required but empty",
                ValidationLevel::Error,
            ));
        }
        if spec.swagger != "2.0" {
            warnings.push(ValidationWarning::new(
                &format!("Swagger version {} is not 2.0", spec.swagger),
                ValidationLevel::Warning,
            ));
        }

        if spec.paths.is_empty() {
            warnings.push(ValidationWarning::new(
                "No paths defined in specification",
                ValidationLevel::Warning,
            ));
        }

        for (path, operations) in &spec.paths {
            if !path.starts_with('/') {
                warnings.push(ValidationWarning::new(
                    &format!("Path '{}' should start with '/'", path),
                    ValidationLevel::Warning,
                ));
            }
            if operations.is_empty() {
                warnings.push(ValidationWarning::new(
                    &format!("Path '{}' has no operations defined", path),
                    ValidationLevel::Warning,
                ));
            }
            for (method, operation) in operations {
                if !operation.responses.contains_key("200") {
                    warnings.push(ValidationWarning::new(
                        &format!("{} {} has no 200 response", method.to_uppercase(), path),
                        ValidationLevel::Error,
                    ));
                }
                if operation.operation_id.is_empty() {
                    warnings.push(ValidationWarning::new(
                        &format!("{} {} has empty operationId", method.to_uppercase(), path),
                        ValidationLevel::Warning,
                    ));
                }
            }
        }

        for reference in Self::collect_references(spec) {
            if !Self::reference_resolves(spec, &reference) {
                warnings.push(ValidationWarning::new(
                    &format!("Reference '{}' does not resolve", reference),
                    ValidationLevel::Error,
                ));
            }
        }

        Ok(warnings)
    }

    /// Every reference string appearing anywhere in the specification
    pub fn collect_references(spec: &SwaggerSpec) -> Vec<String> {
        let mut references = Vec::new();
        for definition in spec.definitions.values() {
            Self::collect_in_value(definition, &mut references);
        }
        for operations in spec.paths.values() {
            for operation in operations.values() {
                Self::collect_in_operation(operation, &mut references);
            }
        }
        references
    }

    /// Whether a `#/definitions/...` reference resolves, walking nested
    /// dotted-namespace groups segment by segment
    pub fn reference_resolves(spec: &SwaggerSpec, reference: &str) -> bool {
        let name = match reference.strip_prefix(DEFINITIONS_PREFIX) {
            Some(name) => name,
            None => return false,
        };
        let mut segments = name.split('/').filter(|s| !s.is_empty());
        let first = match segments.next() {
            Some(first) => first,
            None => return false,
        };
        let mut cursor = match spec.definitions.get(first) {
            Some(value) => value,
            None => return false,
        };
        for segment in segments {
            cursor = match cursor.get(segment) {
                Some(value) => value,
                None => return false,
            };
        }
        true
    }

    fn collect_in_operation(operation: &Operation, references: &mut Vec<String>) {
        for parameter in &operation.parameters {
            if let Some(schema) = &parameter.schema {
                Self::collect_in_schema(schema, references);
            }
            if let Some(items) = &parameter.items {
                Self::collect_in_schema(items, references);
            }
        }
        for response in operation.responses.values() {
            Self::collect_in_value(response, references);
        }
    }

    fn collect_in_schema(schema: &Schema, references: &mut Vec<String>) {
        if let Some(reference) = &schema.reference {
            references.push(reference.clone());
        }
        if let Some(items) = &schema.items {
            Self::collect_in_schema(items, references);
        }
        if let Some(additional) = &schema.additional_properties {
            Self::collect_in_schema(additional, references);
        }
        for property in schema.properties.values() {
            Self::collect_in_schema(property, references);
        }
    }

    fn collect_in_value(value: &Value, references: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    references.push(reference.clone());
                }
                for nested in map.values() {
                    Self::collect_in_value(nested, references);
                }
            }
            Value::Array(values) => {
                for nested in values {
                    Self::collect_in_value(nested, references);
                }
            }
            _ => {}
        }
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

/// Validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub message: String,
    pub level: ValidationLevel,
}

impl ValidationWarning {
    pub fn new(message: &str, level: ValidationLevel) -> Self {
        Self {
            message: message.to_string(),
            level,
        }
    }
}
