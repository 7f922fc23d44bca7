//! Reserved system-column field ids.
//!
//! These ids are fixed by the table format and never appear in a user schema.
//! Most are `i32::MAX - n`; the row-number column of column files is a
//! literal id of its own.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::resolver::SchemaField;

const INT_MAX: i32 = i32::MAX;

/// Row number of a column file.
///
/// Kept as the literal the table format publishes. It coincides with
/// `i32::MAX` instead of sitting at an offset below it like the other
/// reserved ids, so it must not be rewritten as `INT_MAX - n`.
pub const ROW_NUMBER_COLUMN_FILE_ID: i32 = 2147483647;

/// (id, name, type, doc)
const RESERVED: [(i32, &str, &str, &str); 8] = [
    (INT_MAX - 1, "_file", "string", "Path of the file in which a row is stored"),
    (INT_MAX - 2, "_pos", "long", "Ordinal position of a row in the source data file"),
    (INT_MAX - 3, "_deleted", "boolean", "Whether the row has been deleted"),
    (INT_MAX - 4, "_spec_id", "int", "Spec ID used to track the file containing a row"),
    (INT_MAX - 5, "_partition", "struct", "Partition to which a row belongs to"),
    (INT_MAX - 6, "_content_offset", "long", "Content offset of a row in the data file"),
    (INT_MAX - 7, "_content_size_in_bytes", "long", "Content size in bytes of a row"),
    (ROW_NUMBER_COLUMN_FILE_ID, "_row_number_column_file", "long", "Row number of column file"),
];

static RESERVED_FIELDS: LazyLock<HashMap<i32, SchemaField>> = LazyLock::new(|| {
    RESERVED
        .iter()
        .map(|&(id, name, field_type, doc)| {
            let field = SchemaField {
                id,
                name: name.to_string(),
                field_type: field_type.to_string(),
                required: false,
                doc: Some(doc.to_string()),
            };
            (id, field)
        })
        .collect()
});

/// Look up a reserved system column by id.
pub fn reserved_field(id: i32) -> Option<&'static SchemaField> {
    RESERVED_FIELDS.get(&id)
}

/// All reserved system columns, ordered by id.
pub fn reserved_fields() -> Vec<&'static SchemaField> {
    let mut fields: Vec<_> = RESERVED_FIELDS.values().collect();
    fields.sort_by_key(|f| f.id);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_entries() {
        let expected = [
            (1, "_file", "string"),
            (2, "_pos", "long"),
            (3, "_deleted", "boolean"),
            (4, "_spec_id", "int"),
            (5, "_partition", "struct"),
            (6, "_content_offset", "long"),
            (7, "_content_size_in_bytes", "long"),
        ];
        for (n, name, field_type) in expected {
            let field = reserved_field(i32::MAX - n).unwrap();
            assert_eq!(field.name, name);
            assert_eq!(field.field_type, field_type);
        }
    }

    #[test]
    fn test_row_number_literal() {
        assert_eq!(ROW_NUMBER_COLUMN_FILE_ID, 2147483647);
        let field = reserved_field(2147483647).unwrap();
        assert_eq!(field.name, "_row_number_column_file");
        assert_eq!(field.field_type, "long");
    }

    #[test]
    fn test_table_size_and_order() {
        let fields = reserved_fields();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0].name, "_content_size_in_bytes");
        assert_eq!(fields[7].name, "_row_number_column_file");
    }

    #[test]
    fn test_unknown_ids() {
        assert!(reserved_field(0).is_none());
        assert!(reserved_field(i32::MAX - 8).is_none());
        assert!(reserved_field(2047483647).is_none());
    }
}
