/*!
Recursive conversion of field nodes into Swagger schema fragments.

Fragments produced here are in property position: primitives and enums carry
the boolean `required` flag inline, objects carry a `required` name list.
Parameter-level conversion lives with the operation builder, which routes
required-ness to the parameter's own field instead.
*/

use indexmap::IndexMap;

use crate::{
    classify::{classify, SwaggerType},
    error::SwaggerResult,
    fields::{FieldKind, FieldNode},
    registry::DefinitionRegistry,
    specification::{Required, Schema},
};

/// `Some` description only when there is text to show
pub(crate) fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Convert a field node into a schema fragment
///
/// Named composite shapes route through the registry, which decides between
/// a `$ref` and inline expansion; `allow_new_definitions` is inherited by
/// every recursive call.
pub fn convert(
    node: &FieldNode,
    registry: &mut DefinitionRegistry,
    allow_new_definitions: bool,
) -> SwaggerResult<Schema> {
    match &node.kind {
        FieldKind::Reference { target } => Ok(Schema::reference_to(target)),
        FieldKind::Array { items } => convert_array(node, items, registry, allow_new_definitions),
        FieldKind::Object { .. } => convert_object(node, registry, allow_new_definitions),
        FieldKind::Map { values } => Ok(map_schema(node, values)),
        FieldKind::Enum { values } => Ok(Schema {
            schema_type: Some("string".to_string()),
            description: non_empty(&node.description),
            enum_values: values.clone(),
            required: Some(Required::Flag(node.required)),
            ..Default::default()
        }),
        FieldKind::String | FieldKind::Integer | FieldKind::Number | FieldKind::Boolean => {
            let mut schema = primitive_schema(node);
            schema.required = Some(Required::Flag(node.required));
            Ok(schema)
        }
    }
}

/// Convert an array node, collapsing nested array wrappers.
///
/// Swagger has no native multi-dimensional array type, so only the innermost
/// non-array shape is modeled structurally; nesting depth is communicated in
/// the description text instead.
fn convert_array(
    node: &FieldNode,
    items: &FieldNode,
    registry: &mut DefinitionRegistry,
    allow_new_definitions: bool,
) -> SwaggerResult<Schema> {
    let mut dimensions = 1usize;
    let mut innermost = items;
    while let FieldKind::Array { items } = &innermost.kind {
        dimensions += 1;
        innermost = items;
    }

    let description = if dimensions >= 2 {
        if node.description.is_empty() {
            format!("{}D Array", dimensions)
        } else {
            format!("{}D Array {}", dimensions, node.description)
        }
    } else {
        node.description.clone()
    };

    let items_schema = match &innermost.kind {
        FieldKind::Reference { target } => Schema::reference_to(target),
        FieldKind::Enum { values } => Schema {
            schema_type: Some("string".to_string()),
            enum_values: values.clone(),
            ..Default::default()
        },
        FieldKind::Object {
            properties,
            required,
        } => {
            // Object items are inlined with their full property block, not
            // reduced to a bare type.
            let mut item_properties = IndexMap::new();
            for (name, property) in properties {
                item_properties.insert(
                    name.clone(),
                    convert(property, registry, allow_new_definitions)?,
                );
            }
            Schema {
                schema_type: Some("object".to_string()),
                properties: item_properties,
                required: if required.is_empty() {
                    None
                } else {
                    Some(Required::Names(required.clone()))
                },
                ..Default::default()
            }
        }
        FieldKind::Map { values } => {
            let mut schema = Schema::typed("object");
            schema.additional_properties = Some(Box::new(map_value_schema(values)));
            schema
        }
        FieldKind::Array { .. } => unreachable!("nested arrays collapsed above"),
        _ => primitive_schema(innermost),
    };

    Ok(Schema {
        schema_type: Some("array".to_string()),
        description: non_empty(&description),
        items: Some(Box::new(items_schema)),
        ..Default::default()
    })
}

/// Convert an object node, routing named shapes through the registry
fn convert_object(
    node: &FieldNode,
    registry: &mut DefinitionRegistry,
    allow_new_definitions: bool,
) -> SwaggerResult<Schema> {
    match &node.source_identity {
        Some(identity) => {
            let node = node.clone();
            registry.register_or_inline(identity, allow_new_definitions, move |registry| {
                object_schema(&node, registry, allow_new_definitions)
            })
        }
        None => object_schema(node, registry, allow_new_definitions),
    }
}

/// Build the structural schema of an object node
fn object_schema(
    node: &FieldNode,
    registry: &mut DefinitionRegistry,
    allow_new_definitions: bool,
) -> SwaggerResult<Schema> {
    let (properties, required) = match &node.kind {
        FieldKind::Object {
            properties,
            required,
        } => (properties, required),
        _ => unreachable!("object_schema called on non-object node"),
    };

    let mut converted = IndexMap::new();
    for (name, property) in properties {
        converted.insert(
            name.clone(),
            convert(property, registry, allow_new_definitions)?,
        );
    }

    Ok(Schema {
        schema_type: Some("object".to_string()),
        description: non_empty(&node.description),
        properties: converted,
        required: if required.is_empty() {
            None
        } else {
            Some(Required::Names(required.clone()))
        },
        ..Default::default()
    })
}

/// Schema of a map-like node: `additionalProperties` with a uniform value
fn map_schema(node: &FieldNode, values: &FieldNode) -> Schema {
    Schema {
        schema_type: Some("object".to_string()),
        description: non_empty(&node.description),
        additional_properties: Some(Box::new(map_value_schema(values))),
        ..Default::default()
    }
}

/// The `additionalProperties` value: a `$ref` when the value type resolved
/// to a reference, a bare type otherwise
fn map_value_schema(values: &FieldNode) -> Schema {
    match classify(&values.kind) {
        SwaggerType::Ref => match &values.kind {
            FieldKind::Reference { target } => Schema::reference_to(target),
            _ => unreachable!("classified as ref"),
        },
        // Swagger types enums by their underlying primitive.
        SwaggerType::Enum => Schema::typed("string"),
        other => Schema::typed(other.as_str()),
    }
}

/// Bare primitive fragment: type, format, description
fn primitive_schema(node: &FieldNode) -> Schema {
    Schema {
        schema_type: Some(classify(&node.kind).as_str().to_string()),
        format: node.format.clone(),
        description: non_empty(&node.description),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convert_fresh(node: &FieldNode) -> Schema {
        let mut registry = DefinitionRegistry::new();
        convert(node, &mut registry, true).unwrap()
    }

    #[test]
    fn test_primitive_conversion() {
        let schema = convert_fresh(&FieldNode::integer().with_description("A count"));
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({"type": "integer", "description": "A count", "required": true})
        );
    }

    #[test]
    fn test_optional_primitive_carries_flag() {
        let schema = convert_fresh(&FieldNode::string().optional());
        assert_eq!(schema.required, Some(Required::Flag(false)));
    }

    #[test]
    fn test_string_format_survives() {
        let schema = convert_fresh(&FieldNode::string().with_format("date-time"));
        assert_eq!(schema.format, Some("date-time".to_string()));
    }

    #[test]
    fn test_enum_unifies_to_string() {
        let node = FieldNode::enumeration(vec!["red".to_string(), "blue".to_string()]);
        let schema = convert_fresh(&node);
        assert_eq!(schema.schema_type, Some("string".to_string()));
        assert_eq!(schema.enum_values, vec!["red", "blue"]);
    }

    #[test]
    fn test_array_of_primitives() {
        let schema = convert_fresh(&FieldNode::array(FieldNode::string()));
        assert_eq!(schema.schema_type, Some("array".to_string()));
        let items = schema.items.unwrap();
        assert_eq!(items.schema_type, Some("string".to_string()));
    }

    #[test]
    fn test_array_of_enums() {
        let node = FieldNode::array(FieldNode::enumeration(vec!["a".to_string()]));
        let schema = convert_fresh(&node);
        let items = schema.items.unwrap();
        assert_eq!(items.schema_type, Some("string".to_string()));
        assert_eq!(items.enum_values, vec!["a"]);
    }

    #[test]
    fn test_array_of_objects_inlines_properties() {
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), FieldNode::integer());
        let node = FieldNode::array(FieldNode::object(properties, vec!["id".to_string()]));

        let schema = convert_fresh(&node);
        let items = schema.items.unwrap();
        assert_eq!(items.schema_type, Some("object".to_string()));
        assert!(items.properties.contains_key("id"));
        assert_eq!(
            items.required,
            Some(Required::Names(vec!["id".to_string()]))
        );
    }

    #[test]
    fn test_triple_nested_array_dimension_annotation() {
        let node = FieldNode::array(FieldNode::array(FieldNode::array(FieldNode::integer())));
        let schema = convert_fresh(&node);

        assert_eq!(schema.schema_type, Some("array".to_string()));
        assert!(schema.description.unwrap().starts_with("3D Array"));
        let items = schema.items.unwrap();
        assert_eq!(items.schema_type, Some("integer".to_string()));
    }

    #[test]
    fn test_nested_array_description_prefix_joins_text() {
        let node = FieldNode::array(FieldNode::array(FieldNode::string()))
            .with_description("of labels");
        let schema = convert_fresh(&node);
        assert_eq!(schema.description, Some("2D Array of labels".to_string()));
    }

    #[test]
    fn test_map_with_primitive_values() {
        let schema = convert_fresh(&FieldNode::map(FieldNode::integer()));
        assert_eq!(schema.schema_type, Some("object".to_string()));
        let additional = schema.additional_properties.unwrap();
        assert_eq!(additional.schema_type, Some("integer".to_string()));
    }

    #[test]
    fn test_map_with_reference_values() {
        let schema = convert_fresh(&FieldNode::map(FieldNode::reference("User")));
        let additional = schema.additional_properties.unwrap();
        assert_eq!(additional.ref_target(), Some("User"));
    }

    #[test]
    fn test_map_inside_array_items() {
        let node = FieldNode::array(FieldNode::map(FieldNode::string()));
        let schema = convert_fresh(&node);
        let items = schema.items.unwrap();
        assert_eq!(items.schema_type, Some("object".to_string()));
        assert!(items.additional_properties.is_some());
    }

    #[test]
    fn test_named_object_registers_definition() {
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), FieldNode::integer());
        let node = FieldNode::object(properties, vec!["id".to_string()]).with_identity("User");

        let mut registry = DefinitionRegistry::new();
        let schema = convert(&node, &mut registry, true).unwrap();
        assert_eq!(schema.ref_target(), Some("User"));
        assert!(registry.definitions().unwrap().contains_key("User"));
    }

    #[test]
    fn test_named_object_inlines_when_definitions_disallowed() {
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), FieldNode::integer());
        let node = FieldNode::object(properties, vec![]).with_identity("User");

        let mut registry = DefinitionRegistry::new();
        let schema = convert(&node, &mut registry, false).unwrap();
        assert!(!schema.is_reference());
        assert!(registry.definitions().unwrap().is_empty());
    }

    #[test]
    fn test_anonymous_object_inlines() {
        let mut properties = IndexMap::new();
        properties.insert("x".to_string(), FieldNode::number());
        let node = FieldNode::object(properties, vec![]);

        let mut registry = DefinitionRegistry::new();
        let schema = convert(&node, &mut registry, true).unwrap();
        assert!(!schema.is_reference());
        assert!(schema.properties.contains_key("x"));
    }

    #[test]
    fn test_nested_named_objects_register_both() {
        let mut address_props = IndexMap::new();
        address_props.insert("street".to_string(), FieldNode::string());
        let address = FieldNode::object(address_props, vec![]).with_identity("Address");

        let mut user_props = IndexMap::new();
        user_props.insert("address".to_string(), address);
        let user = FieldNode::object(user_props, vec![]).with_identity("User");

        let mut registry = DefinitionRegistry::new();
        let schema = convert(&user, &mut registry, true).unwrap();
        assert_eq!(schema.ref_target(), Some("User"));

        let definitions = registry.definitions().unwrap();
        assert!(definitions.contains_key("Address"));
        assert_eq!(
            definitions["User"].properties["address"].ref_target(),
            Some("Address")
        );
    }
}
