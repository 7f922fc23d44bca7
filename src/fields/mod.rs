//! Field id resolution.
//!
//! Manifests and column files refer to columns by integer field id. The
//! [`FieldResolver`] turns those ids back into schema names and types using
//! the schema of the currently loaded table-metadata version, falling back to
//! the table format's reserved system-column ids.

pub mod reserved;
pub mod resolver;

pub use reserved::{reserved_field, reserved_fields, ROW_NUMBER_COLUMN_FILE_ID};
pub use resolver::{FieldResolver, ResolvedField, SchemaField, PLACEHOLDER};
