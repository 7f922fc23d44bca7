use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::reserved::reserved_field;

/// Rendered in place of a name or type for ids nothing resolves.
pub const PLACEHOLDER: &str = "N/A";

/// A field from a table-metadata schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub id: i32,
    pub name: String,
    /// Primitive type name, or compact JSON for nested types.
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Outcome of resolving a field id for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedField {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub resolved: bool,
}

/// Maps field ids to schema fields for the current table-metadata version.
///
/// The per-version index always wins over the reserved system-column table,
/// so a user field that collides with a reserved id resolves to the user
/// field.
#[derive(Debug, Default)]
pub struct FieldResolver {
    index: HashMap<i32, SchemaField>,
    /// Metadata file the index was built from.
    source: Option<String>,
}

impl FieldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole index with `fields`.
    ///
    /// An empty `fields` is valid and leaves only reserved ids resolvable.
    pub fn rebuild_index<I>(&mut self, source: Option<&str>, fields: I)
    where
        I: IntoIterator<Item = SchemaField>,
    {
        self.index = fields.into_iter().map(|f| (f.id, f)).collect();
        self.source = source.map(str::to_string);
        tracing::debug!(
            "Rebuilt field index with {} fields from {:?}",
            self.index.len(),
            self.source
        );
    }

    /// Look up a field id: schema index first, reserved ids second.
    pub fn resolve(&self, id: i32) -> Option<&SchemaField> {
        self.index.get(&id).or_else(|| reserved_field(id))
    }

    /// Resolve an id for display, substituting [`PLACEHOLDER`] when unknown.
    pub fn resolve_or_placeholder(&self, id: i32) -> ResolvedField {
        match self.resolve(id) {
            Some(field) => ResolvedField {
                id,
                name: field.name.clone(),
                field_type: field.field_type.clone(),
                resolved: true,
            },
            None => ResolvedField {
                id,
                name: PLACEHOLDER.to_string(),
                field_type: PLACEHOLDER.to_string(),
                resolved: false,
            },
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ROW_NUMBER_COLUMN_FILE_ID;
    use proptest::prelude::*;

    fn field(id: i32, name: &str, field_type: &str) -> SchemaField {
        SchemaField {
            id,
            name: name.to_string(),
            field_type: field_type.to_string(),
            required: false,
            doc: None,
        }
    }

    #[test]
    fn test_schema_and_reserved_lookup() {
        let mut resolver = FieldResolver::new();
        resolver.rebuild_index(Some("/t/metadata/v1.metadata.json"), vec![field(5, "amount", "double")]);

        let amount = resolver.resolve_or_placeholder(5);
        assert_eq!(amount.name, "amount");
        assert_eq!(amount.field_type, "double");
        assert!(amount.resolved);

        let file = resolver.resolve_or_placeholder(2147483646);
        assert_eq!((file.name.as_str(), file.field_type.as_str()), ("_file", "string"));

        let pos = resolver.resolve_or_placeholder(2147483645);
        assert_eq!(pos.name, "_pos");
        assert_eq!(pos.field_type, "long");
        assert_eq!(resolver.source(), Some("/t/metadata/v1.metadata.json"));
    }

    #[test]
    fn test_schema_wins_over_reserved_id() {
        let mut resolver = FieldResolver::new();
        resolver.rebuild_index(None, vec![field(ROW_NUMBER_COLUMN_FILE_ID, "shadow", "int")]);
        assert_eq!(resolver.resolve(ROW_NUMBER_COLUMN_FILE_ID).unwrap().name, "shadow");
    }

    #[test]
    fn test_row_number_without_schema_entry() {
        let mut resolver = FieldResolver::new();
        resolver.rebuild_index(None, vec![field(1, "id", "long")]);
        let field = resolver.resolve(2147483647).unwrap();
        assert_eq!(field.name, "_row_number_column_file");
    }

    #[test]
    fn test_rebuild_replaces_instead_of_merging() {
        let mut resolver = FieldResolver::new();
        resolver.rebuild_index(None, vec![field(1, "old", "string"), field(2, "kept", "int")]);
        resolver.rebuild_index(None, vec![field(2, "renamed", "int")]);

        assert!(resolver.resolve(1).is_none());
        assert_eq!(resolver.resolve(2).unwrap().name, "renamed");
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_unknown_id_gets_placeholder() {
        let resolver = FieldResolver::new();
        let unknown = resolver.resolve_or_placeholder(42);
        assert_eq!(unknown.name, PLACEHOLDER);
        assert_eq!(unknown.field_type, PLACEHOLDER);
        assert!(!unknown.resolved);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: after an empty rebuild only reserved ids resolve
        #[test]
        fn prop_empty_index_only_reserved(id in any::<i32>()) {
            let mut resolver = FieldResolver::new();
            resolver.rebuild_index(None, Vec::new());
            prop_assert_eq!(resolver.resolve(id).is_some(), reserved_field(id).is_some());
        }

        /// Property: schema entries always shadow reserved entries
        #[test]
        fn prop_schema_precedence(n in 1i32..=7, name in "[a-z]{1,12}") {
            let id = i32::MAX - n;
            let mut resolver = FieldResolver::new();
            resolver.rebuild_index(None, vec![field(id, &name, "string")]);
            prop_assert_eq!(&resolver.resolve(id).unwrap().name, &name);
        }
    }
}
