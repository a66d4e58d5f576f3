/*!
Conversion of one endpoint link into a Swagger operation.

Fields partition by location. Form fields either map to individual
`formData` parameters (form-encoded requests) or merge into one synthetic
`data` body parameter; a single form field of reference kind is promoted
directly to the body. Query and path parameters can only carry primitives
in Swagger 2.0, so composite shapes degrade there.
*/

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::{
    classify::{classify, SwaggerType},
    error::{SwaggerError, SwaggerResult},
    fields::{FieldKind, FieldLocation, Link, LinkField},
    registry::DefinitionRegistry,
    schema,
    specification::{Operation, Parameter, Required, Schema},
};

/// Media types whose form fields become `formData` parameters
const FORM_ENCODINGS: [&str; 2] = ["multipart/form-data", "application/x-www-form-urlencoded"];

/// Media type forcing a binary body schema
const OCTET_STREAM: &str = "application/octet-stream";

/// Builds Swagger operations from endpoint links
pub struct OperationBuilder {
    /// Matches `{param}` segments of a URL template
    path_param_regex: Regex,
}

impl OperationBuilder {
    /// Create a new operation builder
    pub fn new() -> SwaggerResult<Self> {
        Ok(Self {
            path_param_regex: Regex::new(r"\{([^}]+)\}").map_err(|e| {
                SwaggerError::internal(format!("failed to compile path regex: {}", e))
            })?,
        })
    }

    /// Build one operation from a link
    pub fn build_operation(
        &self,
        operation_id: &str,
        link: &Link,
        tags: &[String],
        registry: &mut DefinitionRegistry,
    ) -> SwaggerResult<Operation> {
        let description = link.description.trim();

        Ok(Operation {
            operation_id: operation_id.to_string(),
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            // The URL template doubles as the summary line.
            summary: Some(link.url.clone()),
            consumes: link.encoding.as_ref().map(|e| vec![e.clone()]),
            tags: tags.to_vec(),
            parameters: self.build_parameters(link, registry)?,
            responses: build_responses(link, registry)?,
        })
    }

    /// Build the parameter list of a link, in stable order: path, query,
    /// individual form/body parameters as supplied, synthesized path
    /// parameters, then the merged body parameter if one is needed
    fn build_parameters(
        &self,
        link: &Link,
        registry: &mut DefinitionRegistry,
    ) -> SwaggerResult<Vec<Parameter>> {
        let form_fields: Vec<&LinkField> = link
            .fields
            .iter()
            .filter(|f| f.location == FieldLocation::Form)
            .collect();

        // Shortcut: the whole request body is one named shape.
        let single_form_reference = form_fields.len() == 1
            && classify(&form_fields[0].schema.kind) == SwaggerType::Ref;

        let form_encoded = link
            .encoding
            .as_deref()
            .is_some_and(|e| FORM_ENCODINGS.contains(&e));

        let mut parameters = Vec::new();
        let mut merged_properties = IndexMap::new();
        let mut merged_required = Vec::new();
        let mut body_parameter: Option<Parameter> = None;

        for field in &link.fields {
            match field.location {
                FieldLocation::Path => {
                    parameters.push(primitive_parameter(field, registry)?);
                }
                FieldLocation::Query => {
                    parameters.push(primitive_parameter(field, registry)?);
                }
                FieldLocation::Form if single_form_reference => {
                    let target = match &field.schema.kind {
                        FieldKind::Reference { target } => target,
                        _ => unreachable!("classified as ref"),
                    };
                    body_parameter = Some(Parameter {
                        name: "data".to_string(),
                        location: "body".to_string(),
                        schema: Some(Schema::reference_to(target)),
                        ..Default::default()
                    });
                }
                FieldLocation::Form if form_encoded => {
                    parameters.push(primitive_parameter(field, registry)?);
                }
                FieldLocation::Form => {
                    // Form fields of a non-form-encoded request merge into
                    // a single body parameter with one property per field.
                    merged_properties.insert(
                        field.name.clone(),
                        schema::convert(&field.schema, registry, true)?,
                    );
                    if field.required {
                        merged_required.push(field.name.clone());
                    }
                }
                FieldLocation::Body => {
                    parameters.push(body_field_parameter(field, link, registry)?);
                }
            }
        }

        // Path parameters present in the URL template but missing from the
        // field list are synthesized as required strings.
        for name in self.template_parameters(&link.url) {
            let covered = link
                .fields
                .iter()
                .any(|f| f.location == FieldLocation::Path && f.name == name);
            if !covered {
                parameters.push(Parameter {
                    name,
                    location: "path".to_string(),
                    required: Some(true),
                    param_type: Some("string".to_string()),
                    ..Default::default()
                });
            }
        }

        if !merged_properties.is_empty() {
            let schema = Schema {
                schema_type: Some("object".to_string()),
                properties: merged_properties,
                required: if merged_required.is_empty() {
                    None
                } else {
                    Some(Required::Names(merged_required))
                },
                ..Default::default()
            };
            body_parameter = Some(Parameter {
                name: "data".to_string(),
                location: "body".to_string(),
                schema: Some(schema),
                ..Default::default()
            });
        }

        parameters.extend(body_parameter);
        Ok(parameters)
    }

    /// Parameter names of a URL template, in order of appearance
    fn template_parameters(&self, url: &str) -> Vec<String> {
        self.path_param_regex
            .captures_iter(url)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// A query, path, or formData parameter. These carry a primitive type at
/// parameter level; composite shapes cannot be expressed there and degrade
/// to a plain string.
fn primitive_parameter(
    field: &LinkField,
    registry: &mut DefinitionRegistry,
) -> SwaggerResult<Parameter> {
    let mut parameter = Parameter {
        name: field.name.clone(),
        location: field.location.as_swagger().to_string(),
        description: schema::non_empty(&field.schema.description),
        required: Some(field.required),
        ..Default::default()
    };

    match &field.schema.kind {
        FieldKind::Enum { values } => {
            parameter.param_type = Some("string".to_string());
            parameter.enum_values = values.clone();
        }
        FieldKind::Array { items } if field.location == FieldLocation::Form => {
            // formData arrays keep their items; elsewhere arrays degrade.
            let items_schema = schema::convert(items, registry, false)?;
            parameter.param_type = Some("array".to_string());
            parameter.items = Some(Box::new(items_schema));
        }
        FieldKind::Array { .. }
        | FieldKind::Object { .. }
        | FieldKind::Map { .. }
        | FieldKind::Reference { .. } => {
            warn!(
                field = field.name.as_str(),
                location = field.location.as_swagger(),
                "composite shape degraded to string parameter"
            );
            parameter.param_type = Some("string".to_string());
        }
        _ => {
            parameter.param_type = Some(classify(&field.schema.kind).as_str().to_string());
            parameter.format = field.schema.format.clone();
        }
    }

    Ok(parameter)
}

/// A standalone body parameter. Octet-stream uploads are not introspectable
/// as structured schema, so their declared kind is overridden with a binary
/// string.
fn body_field_parameter(
    field: &LinkField,
    link: &Link,
    registry: &mut DefinitionRegistry,
) -> SwaggerResult<Parameter> {
    let schema = if link.encoding.as_deref() == Some(OCTET_STREAM) {
        Schema {
            schema_type: Some("string".to_string()),
            format: Some("binary".to_string()),
            ..Default::default()
        }
    } else {
        schema::convert(&field.schema, registry, true)?
    };

    Ok(Parameter {
        name: field.name.clone(),
        location: "body".to_string(),
        description: schema::non_empty(&field.schema.description),
        required: Some(field.required),
        schema: Some(schema),
        ..Default::default()
    })
}

/// Build the responses map: the converted success schema with a merged-in
/// description under "200", then the declared error entries verbatim
fn build_responses(
    link: &Link,
    registry: &mut DefinitionRegistry,
) -> SwaggerResult<IndexMap<String, Value>> {
    let mut success = match &link.response {
        Some(node) => serde_json::to_value(schema::convert(node, registry, true)?)?,
        None => Value::Object(serde_json::Map::new()),
    };
    if let Value::Object(map) = &mut success {
        map.insert(
            "description".to_string(),
            Value::String("Success".to_string()),
        );
    }

    let mut responses = IndexMap::new();
    responses.insert("200".to_string(), success);
    for (status, response) in &link.error_responses {
        responses.insert(status.clone(), response.clone());
    }
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldNode;
    use serde_json::json;

    fn build(link: &Link) -> Operation {
        let builder = OperationBuilder::new().unwrap();
        let mut registry = DefinitionRegistry::new();
        builder
            .build_operation("testOp", link, &[], &mut registry)
            .unwrap()
    }

    #[test]
    fn test_single_form_reference_promotes_to_body() {
        let link = Link::new("POST", "/users").with_field(LinkField::new(
            "user",
            FieldLocation::Form,
            FieldNode::reference("UserSerializer"),
        ));

        let operation = build(&link);
        assert_eq!(operation.parameters.len(), 1);
        assert_eq!(
            serde_json::to_value(&operation.parameters[0]).unwrap(),
            json!({
                "name": "data",
                "in": "body",
                "schema": {"$ref": "#/definitions/UserSerializer"}
            })
        );
    }

    #[test]
    fn test_form_encoded_fields_stay_individual() {
        let link = Link::new("POST", "/upload")
            .with_encoding("multipart/form-data")
            .with_field(LinkField::new("name", FieldLocation::Form, FieldNode::string()))
            .with_field(LinkField::new(
                "age",
                FieldLocation::Form,
                FieldNode::integer(),
            ));

        let operation = build(&link);
        assert_eq!(operation.parameters.len(), 2);
        assert!(operation
            .parameters
            .iter()
            .all(|p| p.location == "formData"));
        assert_eq!(operation.consumes, Some(vec!["multipart/form-data".to_string()]));
    }

    #[test]
    fn test_json_form_fields_merge_into_data_body() {
        let link = Link::new("POST", "/users")
            .with_encoding("application/json")
            .with_field(LinkField::new("name", FieldLocation::Form, FieldNode::string()))
            .with_field(
                LinkField::new("age", FieldLocation::Form, FieldNode::integer()).optional(),
            );

        let operation = build(&link);
        assert_eq!(operation.parameters.len(), 1);
        let parameter = &operation.parameters[0];
        assert_eq!(parameter.name, "data");
        assert_eq!(parameter.location, "body");

        let schema = parameter.schema.as_ref().unwrap();
        assert_eq!(schema.properties.len(), 2);
        assert_eq!(
            schema.required,
            Some(Required::Names(vec!["name".to_string()]))
        );
        // Property fragments carry the inline required flag.
        assert_eq!(
            schema.properties["age"].required,
            Some(Required::Flag(false))
        );
    }

    #[test]
    fn test_merged_body_is_last_parameter() {
        let link = Link::new("POST", "/search")
            .with_encoding("application/json")
            .with_field(LinkField::new("q", FieldLocation::Query, FieldNode::string()))
            .with_field(LinkField::new("name", FieldLocation::Form, FieldNode::string()));

        let operation = build(&link);
        assert_eq!(operation.parameters.len(), 2);
        assert_eq!(operation.parameters[0].location, "query");
        assert_eq!(operation.parameters[1].name, "data");
    }

    #[test]
    fn test_octet_stream_body_forces_binary_schema() {
        let link = Link::new("PUT", "/files").with_encoding(OCTET_STREAM).with_field(
            LinkField::new("file", FieldLocation::Body, FieldNode::integer()),
        );

        let operation = build(&link);
        let schema = operation.parameters[0].schema.as_ref().unwrap();
        assert_eq!(
            serde_json::to_value(schema).unwrap(),
            json!({"type": "string", "format": "binary"})
        );
    }

    #[test]
    fn test_composite_query_degrades_to_string() {
        let mut properties = IndexMap::new();
        properties.insert("nested".to_string(), FieldNode::string());
        let link = Link::new("GET", "/things")
            .with_field(LinkField::new(
                "filter",
                FieldLocation::Query,
                FieldNode::object(properties, vec![]),
            ))
            .with_field(LinkField::new(
                "ids",
                FieldLocation::Query,
                FieldNode::array(FieldNode::integer()),
            ));

        let operation = build(&link);
        assert!(operation
            .parameters
            .iter()
            .all(|p| p.param_type == Some("string".to_string())));
    }

    #[test]
    fn test_enum_query_parameter() {
        let link = Link::new("GET", "/things").with_field(LinkField::new(
            "color",
            FieldLocation::Query,
            FieldNode::enumeration(vec!["red".to_string(), "blue".to_string()]),
        ));

        let operation = build(&link);
        let parameter = &operation.parameters[0];
        assert_eq!(parameter.param_type, Some("string".to_string()));
        assert_eq!(parameter.enum_values, vec!["red", "blue"]);
    }

    #[test]
    fn test_missing_path_parameter_synthesized() {
        let link = Link::new("GET", "/users/{id}/posts/{post_id}").with_field(LinkField::new(
            "id",
            FieldLocation::Path,
            FieldNode::integer(),
        ));

        let operation = build(&link);
        assert_eq!(operation.parameters.len(), 2);
        assert_eq!(operation.parameters[0].name, "id");
        assert_eq!(operation.parameters[0].param_type, Some("integer".to_string()));
        assert_eq!(operation.parameters[1].name, "post_id");
        assert_eq!(operation.parameters[1].param_type, Some("string".to_string()));
        assert_eq!(operation.parameters[1].required, Some(true));
    }

    #[test]
    fn test_responses_include_success_and_errors() {
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), FieldNode::integer());
        let link = Link::new("GET", "/users/{id}")
            .with_response(
                FieldNode::object(properties, vec!["id".to_string()]).with_identity("User"),
            )
            .with_error_response("404", json!({"description": "Not Found"}));

        let builder = OperationBuilder::new().unwrap();
        let mut registry = DefinitionRegistry::new();
        let operation = builder
            .build_operation("getUser", &link, &[], &mut registry)
            .unwrap();

        assert_eq!(
            operation.responses["200"],
            json!({"$ref": "#/definitions/User", "description": "Success"})
        );
        assert_eq!(operation.responses["404"], json!({"description": "Not Found"}));
        assert!(registry.definitions().unwrap().contains_key("User"));
    }

    #[test]
    fn test_summary_defaults_to_url() {
        let link = Link::new("GET", "/users").with_description("  List users  ");
        let operation = build(&link);
        assert_eq!(operation.summary, Some("/users".to_string()));
        assert_eq!(operation.description, Some("List users".to_string()));
    }
}
