//! # Type System
//!
//! - [`value`]: the tagged scalar variant flowing through expressions and
//!   field access.
//! - [`row_type`]: typed identities of operator output rows.

pub mod row_type;
pub mod value;

pub use row_type::{DerivedKind, JoinType, RowType};
pub use value::{ConversionType, Value};
