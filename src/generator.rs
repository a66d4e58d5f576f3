use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    config::SwaggerConfig,
    error::{SwaggerError, SwaggerResult},
    fields::ApiDescription,
    operations::OperationBuilder,
    registry::DefinitionRegistry,
    specification::{ApiInfo, Operation, Schema, SwaggerSpec},
};

/// HTTP methods an endpoint may use
const SUPPORTED_METHODS: [&str; 8] = [
    "GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD", "TRACE",
];

/// Main Swagger document generator
pub struct SwaggerGenerator {
    /// Configuration
    config: SwaggerConfig,
    /// Generated specification
    spec: Option<SwaggerSpec>,
}

impl SwaggerGenerator {
    /// Create a new generator
    pub fn new(config: SwaggerConfig) -> Self {
        Self { config, spec: None }
    }

    /// Generate a Swagger document from an API description.
    ///
    /// Each call works against a fresh definition registry: registration
    /// order decides which names end up retired, so registries are never
    /// reused across generations.
    pub fn generate(&mut self, description: &ApiDescription) -> SwaggerResult<&SwaggerSpec> {
        self.validate_description(description)?;

        let mut registry = DefinitionRegistry::new();
        let builder = OperationBuilder::new()?;

        let mut paths: IndexMap<String, IndexMap<String, Operation>> = IndexMap::new();
        for endpoint in &description.endpoints {
            let operation = builder.build_operation(
                &endpoint.operation_id,
                &endpoint.link,
                &endpoint.tags,
                &mut registry,
            )?;
            paths
                .entry(endpoint.link.url.clone())
                .or_default()
                .insert(endpoint.link.method.to_lowercase(), operation);
        }

        // References handed out before a name was retired cannot be patched
        // through the registry's back-reference index; rewrite them here.
        if registry.has_retired() {
            debug!("resolving references to retired definitions");
            for operations in paths.values_mut() {
                for operation in operations.values_mut() {
                    resolve_retired_in_operation(&registry, operation);
                }
            }
        }

        let (host, schemes) = self.parse_base_url()?;
        let mut spec = SwaggerSpec::new(ApiInfo {
            title: self.config.info.title.clone(),
            description: self.config.info.description.clone().unwrap_or_default(),
            version: self.config.info.version.clone(),
        });
        spec.host = host;
        spec.schemes = schemes;
        spec.definitions = group_definitions(registry.definitions()?)?;
        spec.paths = paths;

        self.spec = Some(spec);
        Ok(self.spec.as_ref().expect("specification just stored"))
    }

    /// Reject malformed endpoint graphs before conversion begins
    fn validate_description(&self, description: &ApiDescription) -> SwaggerResult<()> {
        let mut seen = std::collections::HashSet::new();
        for endpoint in &description.endpoints {
            let link = &endpoint.link;
            if endpoint.operation_id.is_empty() {
                return Err(SwaggerError::description_error(format!(
                    "endpoint '{} {}' has an empty operation id",
                    link.method, link.url
                )));
            }
            if link.url.is_empty() {
                return Err(SwaggerError::description_error(format!(
                    "operation '{}' has an empty URL",
                    endpoint.operation_id
                )));
            }
            let method = link.method.to_uppercase();
            if !SUPPORTED_METHODS.contains(&method.as_str()) {
                return Err(SwaggerError::description_error(format!(
                    "unsupported HTTP method: {}",
                    link.method
                )));
            }
            if !seen.insert((link.url.clone(), method)) {
                return Err(SwaggerError::description_error(format!(
                    "duplicate endpoint: {} {}",
                    link.method, link.url
                )));
            }
        }
        Ok(())
    }

    /// Derive `host` and `schemes` from the configured base URL; either is
    /// omitted when the corresponding component is absent
    fn parse_base_url(&self) -> SwaggerResult<(Option<String>, Option<Vec<String>>)> {
        if self.config.base_url.is_empty() {
            return Ok((None, None));
        }
        let url = Url::parse(&self.config.base_url).map_err(|e| {
            SwaggerError::description_error(format!(
                "invalid base URL '{}': {}",
                self.config.base_url, e
            ))
        })?;

        let host = url.host_str().map(|host| match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        });
        let schemes = Some(vec![url.scheme().to_string()]);
        Ok((host, schemes))
    }

    /// Get the generated specification
    pub fn specification(&self) -> Option<&SwaggerSpec> {
        self.spec.as_ref()
    }

    /// Export the specification as JSON
    pub fn export_json(&self) -> SwaggerResult<String> {
        let spec = self.generated_spec()?;
        if self.config.pretty_print {
            serde_json::to_string_pretty(spec).map_err(SwaggerError::from)
        } else {
            serde_json::to_string(spec).map_err(SwaggerError::from)
        }
    }

    /// Export the specification as JSON with caller-supplied top-level
    /// members overlaid (last write wins)
    pub fn export_json_with(
        &self,
        extra: &serde_json::Map<String, Value>,
    ) -> SwaggerResult<String> {
        let spec = self.generated_spec()?;
        let mut value = serde_json::to_value(spec)?;
        if let Value::Object(map) = &mut value {
            for (key, member) in extra {
                map.insert(key.clone(), member.clone());
            }
        }
        if self.config.pretty_print {
            serde_json::to_string_pretty(&value).map_err(SwaggerError::from)
        } else {
            serde_json::to_string(&value).map_err(SwaggerError::from)
        }
    }

    /// Export the specification as YAML
    pub fn export_yaml(&self) -> SwaggerResult<String> {
        serde_yaml::to_string(self.generated_spec()?).map_err(SwaggerError::from)
    }

    fn generated_spec(&self) -> SwaggerResult<&SwaggerSpec> {
        self.spec.as_ref().ok_or_else(|| {
            SwaggerError::description_error("no specification generated yet; call generate() first")
        })
    }
}

/// Rewrite every reference to a retired definition inside one operation
fn resolve_retired_in_operation(registry: &DefinitionRegistry, operation: &mut Operation) {
    for parameter in &mut operation.parameters {
        if let Some(schema) = &mut parameter.schema {
            registry.resolve_retired(schema);
        }
        if let Some(items) = &mut parameter.items {
            registry.resolve_retired(items);
        }
    }
    for response in operation.responses.values_mut() {
        registry.resolve_retired_value(response);
    }
}

/// Expand definition names containing `/` into nested mapping groups
fn group_definitions(
    definitions: IndexMap<String, Schema>,
) -> SwaggerResult<IndexMap<String, Value>> {
    let mut grouped: IndexMap<String, Value> = IndexMap::new();

    for (name, schema) in definitions {
        let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
        let (leaf, groups) = match segments.split_last() {
            Some(split) => split,
            None => {
                return Err(SwaggerError::internal(format!(
                    "definition key '{}' has no path segments",
                    name
                )))
            }
        };
        let serialized = serde_json::to_value(&schema)?;

        if groups.is_empty() {
            grouped.insert(leaf.to_string(), serialized);
            continue;
        }

        let top = grouped
            .entry(groups[0].to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        let mut cursor = match top {
            Value::Object(map) => map,
            _ => {
                return Err(SwaggerError::internal(format!(
                    "definition group '{}' collides with a schema",
                    groups[0]
                )))
            }
        };
        for group in &groups[1..] {
            let entry = cursor
                .entry(group.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            cursor = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(SwaggerError::internal(format!(
                        "definition group '{}' collides with a schema",
                        group
                    )))
                }
            };
        }
        cursor.insert(leaf.to_string(), serialized);
    }

    Ok(grouped)
}
