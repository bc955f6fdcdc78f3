//! JSON schema definitions.
//!
//! Lets a host describe its models on disk and load them into a
//! [`SchemaRegistry`]. Schemas refer to each other by name; loading is two
//! passes so that self references and forward references both work.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::registry::SchemaRegistry;
use super::types::{FieldDescriptor, FieldKind, FieldOptions, ScalarType, SchemaId};
use crate::directive::Directive;
use crate::error::{AutopopulateError, AutopopulateResult};

/// A file of schema definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchemaDefinitions {
    pub schemas: Vec<JsonSchemaDefinition>,
}

/// One schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonSchemaDefinition {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<JsonSchemaField>,
    #[serde(default)]
    pub computed: Vec<JsonComputedField>,
    #[serde(default)]
    pub variants: Vec<JsonVariant>,
}

/// A stored field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchemaField {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: JsonFieldType,
}

/// Field shape and options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFieldType {
    #[serde(rename = "type")]
    pub field_type: JsonKind,
    /// Sub-schema name for `Embedded`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Element type for `Array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of: Option<Box<JsonFieldType>>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "refPath", default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autopopulate: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonKind {
    String,
    Number,
    Boolean,
    Date,
    ObjectId,
    Mixed,
    Embedded,
    Array,
}

/// A computed (non-stored) field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonComputedField {
    pub name: String,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(rename = "refPath", default)]
    pub ref_path: Option<String>,
    #[serde(default)]
    pub autopopulate: Option<Value>,
}

/// A polymorphic variant of the enclosing schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonVariant {
    pub name: String,
    pub schema: String,
}

fn options_from(
    reference: &Option<String>,
    ref_path: &Option<String>,
    autopopulate: &Option<Value>,
) -> FieldOptions {
    FieldOptions {
        autopopulate: autopopulate.clone().map(Directive::from_json),
        reference: reference.clone(),
        ref_path: ref_path.clone(),
    }
}

fn lookup(registry: &SchemaRegistry, name: &str, context: &str) -> AutopopulateResult<SchemaId> {
    registry.find_by_name(name).ok_or_else(|| {
        AutopopulateError::invalid_schema(format!("{} refers to unknown schema '{}'", context, name))
    })
}

impl JsonFieldType {
    fn build(&self, registry: &SchemaRegistry, context: &str) -> AutopopulateResult<FieldDescriptor> {
        let kind = match self.field_type {
            JsonKind::String => FieldKind::Scalar(ScalarType::String),
            JsonKind::Number => FieldKind::Scalar(ScalarType::Number),
            JsonKind::Boolean => FieldKind::Scalar(ScalarType::Boolean),
            JsonKind::Date => FieldKind::Scalar(ScalarType::Date),
            JsonKind::ObjectId => FieldKind::Scalar(ScalarType::ObjectId),
            JsonKind::Mixed => FieldKind::Scalar(ScalarType::Mixed),
            JsonKind::Embedded => {
                let name = self.schema.as_deref().ok_or_else(|| {
                    AutopopulateError::invalid_schema(format!("{} is Embedded without a schema", context))
                })?;
                FieldKind::Embedded(lookup(registry, name, context)?)
            }
            JsonKind::Array => {
                let element = self.of.as_deref().ok_or_else(|| {
                    AutopopulateError::invalid_schema(format!("{} is an Array without 'of'", context))
                })?;
                FieldKind::Array(Box::new(element.build(registry, context)?))
            }
        };

        Ok(FieldDescriptor {
            kind,
            options: options_from(&self.reference, &self.ref_path, &self.autopopulate),
        })
    }
}

impl JsonSchemaDefinitions {
    /// Build a registry from these definitions.
    ///
    /// # Errors
    /// Returns `AutopopulateError::InvalidSchema` when a schema name is
    /// declared twice or a field, variant or element refers to an unknown
    /// schema.
    pub fn into_registry(self) -> AutopopulateResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        let mut ids = Vec::with_capacity(self.schemas.len());

        for definition in &self.schemas {
            if registry.find_by_name(&definition.name).is_some() {
                return Err(AutopopulateError::invalid_schema(format!(
                    "schema '{}' is declared twice",
                    definition.name
                )));
            }
            ids.push(registry.add(definition.name.clone()));
        }

        for (definition, id) in self.schemas.iter().zip(ids) {
            let mut fields = Vec::with_capacity(definition.fields.len());
            for field in &definition.fields {
                let context = format!("{}.{}", definition.name, field.name);
                fields.push((field.name.clone(), field.descriptor.build(&registry, &context)?));
            }
            let mut variants = Vec::with_capacity(definition.variants.len());
            for variant in &definition.variants {
                let context = format!("variant '{}' of {}", variant.name, definition.name);
                variants.push((variant.name.clone(), lookup(&registry, &variant.schema, &context)?));
            }

            let schema = registry.get_mut(id)?;
            for (name, field) in fields {
                schema.add_field(name, field);
            }
            for computed in &definition.computed {
                schema.add_computed(
                    computed.name.clone(),
                    options_from(&computed.reference, &computed.ref_path, &computed.autopopulate),
                );
            }
            for (name, variant) in variants {
                schema.add_variant(name, variant);
            }
        }

        Ok(registry)
    }
}

impl SchemaRegistry {
    /// Parse JSON schema definitions into a registry
    pub fn from_json_str(json: &str) -> AutopopulateResult<Self> {
        let definitions: JsonSchemaDefinitions = serde_json::from_str(json)?;
        definitions.into_registry()
    }

    /// Load JSON schema definitions from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AutopopulateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: &str = r#"{
        "schemas": [
            {
                "name": "Band",
                "fields": [
                    { "name": "name", "type": "String" },
                    { "name": "lead", "type": "ObjectId", "ref": "people", "autopopulate": true },
                    {
                        "name": "members",
                        "type": "Array",
                        "of": { "type": "ObjectId", "ref": "people", "autopopulate": { "select": "name" } }
                    },
                    { "name": "tour", "type": "Embedded", "schema": "Tour" }
                ],
                "computed": [
                    { "name": "fans", "ref": "people", "autopopulate": false }
                ]
            },
            {
                "name": "Tour",
                "fields": [
                    { "name": "venue", "type": "ObjectId", "ref": "venues", "autopopulate": true }
                ],
                "variants": [ { "name": "WorldTour", "schema": "WorldTour" } ]
            },
            { "name": "WorldTour", "fields": [] }
        ]
    }"#;

    #[test]
    fn loads_fields_in_declaration_order() {
        let registry = SchemaRegistry::from_json_str(BANDS).unwrap();
        let band = registry.get(registry.find_by_name("Band").unwrap()).unwrap();

        let names: Vec<&str> = band.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "lead", "members", "tour"]);

        let tour = registry.find_by_name("Tour").unwrap();
        assert_eq!(band.field("tour").unwrap().sub_schema(), Some(tour));
        assert_eq!(
            registry.get(tour).unwrap().variant("WorldTour"),
            registry.find_by_name("WorldTour")
        );
    }

    #[test]
    fn converts_autopopulate_values() {
        let registry = SchemaRegistry::from_json_str(BANDS).unwrap();
        let band = registry.get(registry.find_by_name("Band").unwrap()).unwrap();

        assert!(matches!(
            band.field("lead").unwrap().options.autopopulate,
            Some(Directive::Enabled)
        ));
        match &band.field("members").unwrap().kind {
            FieldKind::Array(element) => {
                assert!(matches!(element.options.autopopulate, Some(Directive::Options(_))));
                assert_eq!(element.options.reference.as_deref(), Some("people"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        let (_, fans) = band.computed_fields().next().unwrap();
        assert!(fans.truthy_directive().is_none());
    }

    #[test]
    fn rejects_unknown_schema_names() {
        let json = r#"{ "schemas": [
            { "name": "A", "fields": [ { "name": "b", "type": "Embedded", "schema": "B" } ] }
        ] }"#;
        let err = SchemaRegistry::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("unknown schema 'B'"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let json = r#"{ "schemas": [ { "name": "A" }, { "name": "A" } ] }"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(json),
            Err(AutopopulateError::InvalidSchema(_))
        ));
    }
}
