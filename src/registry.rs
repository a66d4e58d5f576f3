/*!
Definition deduplication registry.

Composite shapes are registered under their shape-class identity so repeated
occurrences collapse to one shared `$ref`. Identity does not guarantee
structural stability, so the registry compares flattened shapes on every
re-registration and, when the same name produces two incompatible shapes,
falls back to inlining everywhere that name was used instead of keeping a
semantically wrong reference.
*/

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{SwaggerError, SwaggerResult},
    specification::{Schema, DEFINITIONS_PREFIX},
};

/// Lifecycle state of one named definition
#[derive(Debug, Clone)]
enum EntryState {
    /// Name reserved, schema body still being converted. Lookups during
    /// this window resolve to a reference, which is what lets cyclic
    /// shape graphs terminate.
    Pending,
    /// Registered with a stable schema
    Live(Schema),
    /// Retired after a reconciliation conflict. Carries the schema that
    /// triggered retirement so late call sites can still inline it; the
    /// carried copy is kept patched when further names retire, so it
    /// never holds a reference to another tombstone.
    /// Never referenced again within this generation pass.
    Retired(Schema),
}

/// Registry record for one definition name
#[derive(Debug, Clone)]
struct DefinitionEntry {
    state: EntryState,
    /// Names of other definitions whose stored schema currently holds a
    /// `$ref` to this one; used to patch back-references on conflict
    referenced_by: HashSet<String>,
}

/// Mutable definition store scoped to one document-generation pass
///
/// Must not be shared across generations: mutation order decides which
/// names end up tombstoned.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    entries: IndexMap<String, DefinitionEntry>,
}

impl DefinitionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named composite shape, or decide to inline it.
    ///
    /// `build` converts the shape's body and runs *after* the name has
    /// been reserved, so recursive occurrences of the same name resolve
    /// to a reference instead of recursing forever.
    pub fn register_or_inline<F>(
        &mut self,
        identity: &str,
        allow_new_definitions: bool,
        build: F,
    ) -> SwaggerResult<Schema>
    where
        F: FnOnce(&mut Self) -> SwaggerResult<Schema>,
    {
        let state = self.entries.get(identity).map(|e| e.state.clone());
        match state {
            None => {
                if !allow_new_definitions {
                    return build(self);
                }
                // Two-phase insert: reserve first, populate after the
                // recursive conversion completes.
                self.entries.insert(
                    identity.to_string(),
                    DefinitionEntry {
                        state: EntryState::Pending,
                        referenced_by: HashSet::new(),
                    },
                );
                let schema = build(self)?;
                self.populate(identity, schema)?;
                debug!(definition = identity, "registered shared definition");
                Ok(Schema::reference_to(identity))
            }
            // Back-edge of a cyclic shape graph: the in-progress
            // definition is referenceable even though its body is not
            // populated yet.
            Some(EntryState::Pending) => Ok(Schema::reference_to(identity)),
            Some(EntryState::Retired(_)) => build(self),
            Some(EntryState::Live(stored)) => {
                let schema = build(self)?;
                if self.flatten(&stored)? == self.flatten(&schema)? {
                    debug!(definition = identity, "definition cache hit");
                    Ok(Schema::reference_to(identity))
                } else {
                    warn!(
                        definition = identity,
                        "structural mismatch, retiring definition and inlining"
                    );
                    self.retire(identity, schema.clone())?;
                    Ok(schema)
                }
            }
        }
    }

    /// Fill in the body of a reserved definition and index its outgoing
    /// references
    fn populate(&mut self, identity: &str, mut schema: Schema) -> SwaggerResult<()> {
        // Conversions below this shape may have retired names this body
        // still references; those refs can no longer be served.
        self.resolve_retired(&mut schema);

        let entry = self
            .entries
            .get_mut(identity)
            .ok_or_else(|| SwaggerError::internal(format!("populate of unreserved '{identity}'")))?;
        if !matches!(entry.state, EntryState::Pending) {
            return Err(SwaggerError::internal(format!(
                "definition '{identity}' populated twice"
            )));
        }
        entry.state = EntryState::Live(schema.clone());

        let mut targets = Vec::new();
        collect_ref_targets(&schema, &mut targets);
        for target in targets {
            let target_entry = self.entries.get_mut(&target).ok_or_else(|| {
                SwaggerError::internal(format!(
                    "definition '{identity}' references unregistered '{target}'"
                ))
            })?;
            target_entry.referenced_by.insert(identity.to_string());
        }
        Ok(())
    }

    /// Retire a conflicted name: patch every back-reference to inline the
    /// schema that triggered the conflict, then tombstone the name
    fn retire(&mut self, identity: &str, conflicting: Schema) -> SwaggerResult<()> {
        let referencers = match self.entries.get_mut(identity) {
            Some(entry) => {
                let refs = std::mem::take(&mut entry.referenced_by);
                entry.state = EntryState::Retired(conflicting.clone());
                refs
            }
            None => {
                return Err(SwaggerError::internal(format!(
                    "retire of unregistered '{identity}'"
                )))
            }
        };

        // The carried schema may itself reference other definitions; index
        // those so later retirements keep this tombstone patched too.
        let mut carried_targets = Vec::new();
        collect_ref_targets(&conflicting, &mut carried_targets);
        for target in carried_targets {
            if let Some(target_entry) = self.entries.get_mut(&target) {
                target_entry.referenced_by.insert(identity.to_string());
            }
        }

        for referencer in referencers {
            let (stored, was_live) = match self.entries.get(&referencer).map(|e| &e.state) {
                Some(EntryState::Live(schema)) => (schema.clone(), true),
                // A referencer retired earlier still carries its own
                // conflicting schema for late call sites; that copy must
                // stop referencing this name as well.
                Some(EntryState::Retired(schema)) => (schema.clone(), false),
                // An in-progress body is patched at populate time instead.
                Some(EntryState::Pending) => continue,
                None => {
                    return Err(SwaggerError::internal(format!(
                        "back-reference index names unregistered '{referencer}'"
                    )))
                }
            };
            let mut patched = stored;
            inline_refs(&mut patched, identity, &conflicting);

            // The inlined body may reference further definitions; keep the
            // back-reference index consistent for them too.
            let mut targets = Vec::new();
            collect_ref_targets(&patched, &mut targets);
            for target in targets {
                if target == identity {
                    return Err(SwaggerError::internal(format!(
                        "reference to '{identity}' survived its retirement in '{referencer}'"
                    )));
                }
                if let Some(target_entry) = self.entries.get_mut(&target) {
                    target_entry.referenced_by.insert(referencer.clone());
                }
            }

            if was_live {
                // Recomputing the flattening must succeed after a patch
                // that should have kept the entry consistent.
                self.flatten(&patched)?;
            }

            if let Some(entry) = self.entries.get_mut(&referencer) {
                entry.state = if was_live {
                    EntryState::Live(patched)
                } else {
                    EntryState::Retired(patched)
                };
            }
        }
        Ok(())
    }

    /// Resolve all `$ref`s in a fragment recursively, producing the
    /// reference-free structural form used for equality comparison.
    ///
    /// Cyclic references are left in place once revisited so flattening
    /// terminates; two schemas then compare equal only when their cycles
    /// run through the same names.
    pub fn flatten(&self, schema: &Schema) -> SwaggerResult<Schema> {
        let mut visiting = HashSet::new();
        self.flatten_inner(schema, &mut visiting)
    }

    fn flatten_inner(
        &self,
        schema: &Schema,
        visiting: &mut HashSet<String>,
    ) -> SwaggerResult<Schema> {
        if let Some(name) = schema.ref_target() {
            if visiting.contains(name) {
                return Ok(schema.clone());
            }
            let resolved = match self.entries.get(name).map(|e| &e.state) {
                Some(EntryState::Live(stored)) => {
                    visiting.insert(name.to_string());
                    let flat = self.flatten_inner(&stored.clone(), visiting)?;
                    visiting.remove(name);
                    flat
                }
                // An in-progress definition has no body to compare yet;
                // the reference itself is its shape.
                Some(EntryState::Pending) => schema.clone(),
                Some(EntryState::Retired(_)) | None => {
                    return Err(SwaggerError::internal(format!(
                        "flattening hit unresolvable reference '{name}'"
                    )))
                }
            };
            return Ok(resolved);
        }

        let mut flat = schema.clone();
        if let Some(items) = &schema.items {
            flat.items = Some(Box::new(self.flatten_inner(items, visiting)?));
        }
        if let Some(additional) = &schema.additional_properties {
            flat.additional_properties = Some(Box::new(self.flatten_inner(additional, visiting)?));
        }
        for (name, property) in &schema.properties {
            flat.properties
                .insert(name.clone(), self.flatten_inner(property, visiting)?);
        }
        Ok(flat)
    }

    /// Replace every `$ref` to a retired name with the schema its
    /// retirement carried
    pub fn resolve_retired(&self, schema: &mut Schema) {
        let retired: Vec<(String, Schema)> = self
            .entries
            .iter()
            .filter_map(|(name, entry)| match &entry.state {
                EntryState::Retired(s) => Some((name.clone(), s.clone())),
                _ => None,
            })
            .collect();
        for (name, replacement) in &retired {
            inline_refs(schema, name, replacement);
        }
    }

    /// As [`Self::resolve_retired`], over an untyped JSON fragment
    pub fn resolve_retired_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                if let Some(target) = map
                    .get("$ref")
                    .and_then(Value::as_str)
                    .and_then(|r| r.strip_prefix(DEFINITIONS_PREFIX))
                {
                    if let Some(EntryState::Retired(replacement)) =
                        self.entries.get(target).map(|e| &e.state)
                    {
                        // Serialization of a Schema cannot fail.
                        if let Ok(inline) = serde_json::to_value(replacement) {
                            *value = inline;
                        }
                        return;
                    }
                }
                for nested in map.values_mut() {
                    self.resolve_retired_value(nested);
                }
            }
            Value::Array(values) => {
                for nested in values {
                    self.resolve_retired_value(nested);
                }
            }
            _ => {}
        }
    }

    /// Whether any name was retired during this pass
    pub fn has_retired(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e.state, EntryState::Retired(_)))
    }

    /// Drain the live definitions, in registration order
    pub fn definitions(&self) -> SwaggerResult<IndexMap<String, Schema>> {
        let mut definitions = IndexMap::new();
        for (name, entry) in &self.entries {
            match &entry.state {
                EntryState::Live(schema) => {
                    definitions.insert(name.clone(), schema.clone());
                }
                EntryState::Retired(_) => {}
                EntryState::Pending => {
                    return Err(SwaggerError::internal(format!(
                        "definition '{name}' still pending at finalization"
                    )))
                }
            }
        }
        Ok(definitions)
    }
}

/// Collect the definition names a fragment references, at any depth
fn collect_ref_targets(schema: &Schema, targets: &mut Vec<String>) {
    if let Some(name) = schema.ref_target() {
        targets.push(name.to_string());
        return;
    }
    if let Some(items) = &schema.items {
        collect_ref_targets(items, targets);
    }
    if let Some(additional) = &schema.additional_properties {
        collect_ref_targets(additional, targets);
    }
    for property in schema.properties.values() {
        collect_ref_targets(property, targets);
    }
}

/// Replace every `$ref` to `name` with `replacement`, at any depth
fn inline_refs(schema: &mut Schema, name: &str, replacement: &Schema) {
    if schema.ref_target() == Some(name) {
        *schema = replacement.clone();
        return;
    }
    if let Some(items) = &mut schema.items {
        inline_refs(items, name, replacement);
    }
    if let Some(additional) = &mut schema.additional_properties {
        inline_refs(additional, name, replacement);
    }
    for property in schema.properties.values_mut() {
        inline_refs(property, name, replacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::Required;

    fn object_schema(fields: &[(&str, &str)]) -> Schema {
        let mut properties = IndexMap::new();
        for (name, type_name) in fields {
            properties.insert(name.to_string(), Schema::typed(type_name));
        }
        Schema {
            schema_type: Some("object".to_string()),
            properties,
            required: Some(Required::Names(
                fields.iter().map(|(n, _)| n.to_string()).collect(),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_registration_returns_reference() {
        let mut registry = DefinitionRegistry::new();
        let schema = registry
            .register_or_inline("User", true, |_| Ok(object_schema(&[("id", "integer")])))
            .unwrap();
        assert_eq!(schema.ref_target(), Some("User"));
        assert_eq!(registry.definitions().unwrap().len(), 1);
    }

    #[test]
    fn test_disallowed_registration_inlines() {
        let mut registry = DefinitionRegistry::new();
        let schema = registry
            .register_or_inline("User", false, |_| Ok(object_schema(&[("id", "integer")])))
            .unwrap();
        assert!(!schema.is_reference());
        assert!(registry.definitions().unwrap().is_empty());
    }

    #[test]
    fn test_structural_cache_hit() {
        let mut registry = DefinitionRegistry::new();
        let first = registry
            .register_or_inline("User", true, |_| Ok(object_schema(&[("id", "integer")])))
            .unwrap();
        let second = registry
            .register_or_inline("User", true, |_| Ok(object_schema(&[("id", "integer")])))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.definitions().unwrap().len(), 1);
    }

    #[test]
    fn test_conflict_retires_and_inlines() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register_or_inline("User", true, |_| Ok(object_schema(&[("id", "integer")])))
            .unwrap();

        let conflicting = object_schema(&[("name", "string")]);
        let returned = {
            let conflicting = conflicting.clone();
            registry
                .register_or_inline("User", true, move |_| Ok(conflicting))
                .unwrap()
        };
        assert_eq!(returned, conflicting);
        assert!(registry.has_retired());
        assert!(registry.definitions().unwrap().is_empty());

        // Once retired, the name is never shared again.
        let again = registry
            .register_or_inline("User", true, |_| Ok(object_schema(&[("id", "integer")])))
            .unwrap();
        assert!(!again.is_reference());
    }

    #[test]
    fn test_conflict_patches_back_references() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register_or_inline("Address", true, |_| {
                Ok(object_schema(&[("street", "string")]))
            })
            .unwrap();

        // "User" holds a reference to "Address".
        registry
            .register_or_inline("User", true, |registry| {
                let address = registry.register_or_inline("Address", true, |_| {
                    Ok(object_schema(&[("street", "string")]))
                })?;
                let mut schema = object_schema(&[("id", "integer")]);
                schema.properties.insert("address".to_string(), address);
                Ok(schema)
            })
            .unwrap();

        // A structurally different "Address" forces retirement.
        let conflicting = object_schema(&[("lines", "string"), ("zip", "string")]);
        {
            let conflicting = conflicting.clone();
            registry
                .register_or_inline("Address", true, move |_| Ok(conflicting))
                .unwrap();
        }

        let definitions = registry.definitions().unwrap();
        assert!(!definitions.contains_key("Address"));
        let user = &definitions["User"];
        assert_eq!(user.properties["address"], conflicting);
    }

    #[test]
    fn test_cascading_retirements_patch_tombstones() {
        // "User" references "Address"; "User" retires first, then
        // "Address" retires while the back-reference index still names
        // the already-retired "User".
        let mut registry = DefinitionRegistry::new();
        registry
            .register_or_inline("Address", true, |_| {
                Ok(object_schema(&[("street", "string")]))
            })
            .unwrap();
        registry
            .register_or_inline("User", true, |registry| {
                let address = registry.register_or_inline("Address", true, |_| {
                    Ok(object_schema(&[("street", "string")]))
                })?;
                let mut schema = object_schema(&[("id", "integer")]);
                schema.properties.insert("address".to_string(), address);
                Ok(schema)
            })
            .unwrap();

        // "User" conflicts; its carried schema still references "Address".
        registry
            .register_or_inline("User", true, |registry| {
                let address = registry.register_or_inline("Address", true, |_| {
                    Ok(object_schema(&[("street", "string")]))
                })?;
                let mut schema = object_schema(&[("email", "string")]);
                schema.properties.insert("address".to_string(), address);
                Ok(schema)
            })
            .unwrap();

        // "Address" conflicts afterwards; this must patch the retired
        // "User" tombstone rather than abort.
        let conflicting = object_schema(&[("lines", "string"), ("zip", "string")]);
        {
            let conflicting = conflicting.clone();
            registry
                .register_or_inline("Address", true, move |_| Ok(conflicting))
                .unwrap();
        }
        assert!(registry.definitions().unwrap().is_empty());

        // A late reference to "User" resolves to a carried schema with no
        // reference to the also-retired "Address" left inside.
        let mut late = Schema::reference_to("User");
        registry.resolve_retired(&mut late);
        assert!(!late.is_reference());
        assert_eq!(late.properties["address"], conflicting);
    }

    #[test]
    fn test_cyclic_registration_terminates() {
        // Node -> children -> Node
        let mut registry = DefinitionRegistry::new();
        let schema = registry
            .register_or_inline("Node", true, |registry| {
                let child = registry.register_or_inline("Node", true, |_| {
                    unreachable!("pending name must resolve to a reference")
                })?;
                let mut node = object_schema(&[("value", "string")]);
                node.properties.insert(
                    "children".to_string(),
                    Schema {
                        schema_type: Some("array".to_string()),
                        items: Some(Box::new(child)),
                        ..Default::default()
                    },
                );
                Ok(node)
            })
            .unwrap();
        assert_eq!(schema.ref_target(), Some("Node"));

        let definitions = registry.definitions().unwrap();
        let items = definitions["Node"].properties["children"]
            .items
            .as_ref()
            .unwrap();
        assert_eq!(items.ref_target(), Some("Node"));
    }

    #[test]
    fn test_flatten_resolves_references() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register_or_inline("Address", true, |_| {
                Ok(object_schema(&[("street", "string")]))
            })
            .unwrap();

        let mut user = object_schema(&[("id", "integer")]);
        user.properties
            .insert("address".to_string(), Schema::reference_to("Address"));

        let flat = registry.flatten(&user).unwrap();
        assert_eq!(flat.properties["address"], object_schema(&[("street", "string")]));
    }

    #[test]
    fn test_flatten_unknown_reference_is_internal_error() {
        let registry = DefinitionRegistry::new();
        let err = registry
            .flatten(&Schema::reference_to("Ghost"))
            .unwrap_err();
        assert!(matches!(err, SwaggerError::Internal(_)));
    }
}
