//! # Row Codec
//!
//! Self-describing binary rows and their schemas.
//!
//! A row is a self-delimiting record framed by a fixed envelope: leading
//! length and signature, field count and row-def id, then a null bitmap,
//! fixed fields, variable-length offsets and payloads, and a trailing
//! signature and length. One buffer may hold several rows laid out
//! contiguously; [`row::RowData`] parses, constructs and iterates them,
//! while [`schema::RowDef`] resolves per-field locations.
//!
//! ## Module Structure
//!
//! - `schema`: `RowDef` / `FieldDef` static row description
//! - `row`: the `RowData` codec itself

pub mod row;
pub mod schema;

#[cfg(test)]
mod tests;

pub use row::RowData;
pub use schema::{FieldDef, FieldLocation, RowDef};
