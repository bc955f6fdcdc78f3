use serde::{Deserialize, Serialize};
use std::fmt;

use crate::directive::Directive;

/// Identifier of a schema inside a [`SchemaRegistry`](super::SchemaRegistry).
///
/// Schema identity for cycle detection is this id, not the schema's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(usize);

impl SchemaId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

/// Primitive field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Date,
    ObjectId,
    Mixed,
}

/// Shape of a stored field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarType),
    /// Single embedded sub-document
    Embedded(SchemaId),
    /// Array; an `Embedded` element makes it a document array
    Array(Box<FieldDescriptor>),
}

/// Options bag of a stored or computed field.
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub autopopulate: Option<Directive>,
    /// Static foreign model
    pub reference: Option<String>,
    /// Field holding the foreign model name per document
    pub ref_path: Option<String>,
}

impl FieldOptions {
    /// Options of a reference to `model`
    pub fn reference(model: impl Into<String>) -> Self {
        Self {
            reference: Some(model.into()),
            ..Self::default()
        }
    }

    /// Options of a reference whose model is read from `selector` per document
    pub fn ref_path(selector: impl Into<String>) -> Self {
        Self {
            ref_path: Some(selector.into()),
            ..Self::default()
        }
    }

    pub fn autopopulate(mut self, directive: impl Into<Directive>) -> Self {
        self.autopopulate = Some(directive.into());
        self
    }

    /// The configured directive when it asks for population
    pub fn truthy_directive(&self) -> Option<&Directive> {
        self.autopopulate.as_ref().filter(|d| d.is_truthy())
    }
}

/// A stored field: its shape plus its options.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    pub options: FieldOptions,
}

impl FieldDescriptor {
    pub fn scalar(scalar: ScalarType) -> Self {
        Self {
            kind: FieldKind::Scalar(scalar),
            options: FieldOptions::default(),
        }
    }

    /// `ObjectId` reference to `model`
    pub fn reference(model: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Scalar(ScalarType::ObjectId),
            options: FieldOptions::reference(model),
        }
    }

    /// `ObjectId` reference whose model name lives in the `selector` field
    pub fn dynamic_reference(selector: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Scalar(ScalarType::ObjectId),
            options: FieldOptions::ref_path(selector),
        }
    }

    pub fn embedded(schema: SchemaId) -> Self {
        Self {
            kind: FieldKind::Embedded(schema),
            options: FieldOptions::default(),
        }
    }

    pub fn array_of(element: FieldDescriptor) -> Self {
        Self {
            kind: FieldKind::Array(Box::new(element)),
            options: FieldOptions::default(),
        }
    }

    pub fn document_array(schema: SchemaId) -> Self {
        Self::array_of(Self::embedded(schema))
    }

    pub fn autopopulate(mut self, directive: impl Into<Directive>) -> Self {
        self.options.autopopulate = Some(directive.into());
        self
    }

    /// Sub-schema when this field is an embedded document or a document array
    pub fn sub_schema(&self) -> Option<SchemaId> {
        match &self.kind {
            FieldKind::Embedded(id) => Some(*id),
            FieldKind::Array(element) => match element.kind {
                FieldKind::Embedded(id) => Some(id),
                _ => None,
            },
            FieldKind::Scalar(_) => None,
        }
    }
}

/// Named tree of fields, computed fields and polymorphic variants.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    fields: Vec<(String, FieldDescriptor)>,
    computed: Vec<(String, FieldOptions)>,
    variants: Vec<(String, SchemaId)>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            computed: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// Add (or replace) a stored field, keeping declaration order
    pub fn add_field(&mut self, field_name: impl Into<String>, field: FieldDescriptor) -> &mut Self {
        let field_name = field_name.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field_name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((field_name, field)),
        }
        self
    }

    /// Add a computed (non-stored) field
    pub fn add_computed(&mut self, field_name: impl Into<String>, options: FieldOptions) -> &mut Self {
        self.computed.push((field_name.into(), options));
        self
    }

    /// Register a polymorphic variant extending this schema
    pub fn add_variant(&mut self, variant_name: impl Into<String>, schema: SchemaId) -> &mut Self {
        self.variants.push((variant_name.into(), schema));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, field_name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|(name, _)| name == field_name)
            .map(|(_, field)| field)
    }

    pub fn computed_fields(&self) -> impl Iterator<Item = (&str, &FieldOptions)> {
        self.computed.iter().map(|(name, options)| (name.as_str(), options))
    }

    pub fn variants(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.variants.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn variant(&self, variant_name: &str) -> Option<SchemaId> {
        self.variants
            .iter()
            .find(|(name, _)| name == variant_name)
            .map(|(_, id)| *id)
    }
}
