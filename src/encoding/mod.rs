//! # Field and Byte Encodings
//!
//! Low-level building blocks of the row codec:
//!
//! - [`bytes`]: fixed-width little-endian integer access at arbitrary
//!   offsets and the `var_width` selector for cumulative offset slots.
//! - [`field`]: per-type encode/decode of scalar values, with fixed vs
//!   variable-size classification and character-set aware string decoding.

pub mod bytes;
pub mod field;

pub use bytes::var_width;
pub use field::{Charset, FieldType};
