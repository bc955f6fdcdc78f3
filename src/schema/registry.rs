use std::collections::HashMap;

use super::types::{Schema, SchemaId};
use crate::error::{AutopopulateError, AutopopulateResult};

/// Arena owning every schema a host has declared.
///
/// Ids are handed out by [`SchemaRegistry::add`] before the schema's fields
/// exist, so a field may point at the schema being built or at one declared
/// later.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
    by_name: HashMap<String, SchemaId>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an empty schema and return its id
    pub fn add(&mut self, name: impl Into<String>) -> SchemaId {
        let name = name.into();
        let id = SchemaId::new(self.schemas.len());
        self.by_name.insert(name.clone(), id);
        self.schemas.push(Schema::new(name));
        id
    }

    pub fn get(&self, id: SchemaId) -> AutopopulateResult<&Schema> {
        self.schemas
            .get(id.index())
            .ok_or(AutopopulateError::SchemaNotFound { id })
    }

    pub fn get_mut(&mut self, id: SchemaId) -> AutopopulateResult<&mut Schema> {
        self.schemas
            .get_mut(id.index())
            .ok_or(AutopopulateError::SchemaNotFound { id })
    }

    pub fn find_by_name(&self, name: &str) -> Option<SchemaId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &Schema)> {
        self.schemas
            .iter()
            .enumerate()
            .map(|(index, schema)| (SchemaId::new(index), schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    #[test]
    fn ids_are_reserved_before_fields_exist() {
        let mut registry = SchemaRegistry::new();
        let node = registry.add("Node");
        registry
            .get_mut(node)
            .unwrap()
            .add_field("children", FieldDescriptor::document_array(node));

        let schema = registry.get(node).unwrap();
        assert_eq!(schema.field("children").unwrap().sub_schema(), Some(node));
        assert_eq!(registry.find_by_name("Node"), Some(node));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.get(SchemaId::new(3)),
            Err(AutopopulateError::SchemaNotFound { .. })
        ));
    }
}
