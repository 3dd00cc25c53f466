//! # rowtree - Hierarchical Row Engine Fragment
//!
//! rowtree is the execution core of a relational engine over
//! hierarchically-stored tables: a compact self-describing binary **row
//! codec** and a tree-structured **physical operator** framework pulling
//! rows through cursors.
//!
//! Tables joined by parent/child keys are stored co-located in *groups*
//! and iterated in *hkey* order, so a single scan interleaves parents with
//! their descendants. The operators exploit that order: flatten joins
//! parent/child streams without buffering, select drops whole subtrees,
//! lookups navigate by hkey prefix, and nested-loop operators pass outer
//! rows to inner plans through positional bindings.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowtree::exec::api;
//! use rowtree::types::JoinType;
//!
//! let plan = api::flatten_hkey_ordered(
//!     api::group_scan(group, api::no_limit()),
//!     customer_type,
//!     order_type,
//!     JoinType::Inner,
//!     &[],
//! );
//! let mut cursor = api::cursor(&plan, &adapter);
//! cursor.open()?;
//! while let Some(row) = cursor.next()? {
//!     // one row per customer/order pair, in hkey order
//! }
//! cursor.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Operator factory surface (api)     │
//! ├─────────────────────────────────────┤
//! │  Operator tree / cursors / bindings  │
//! ├─────────────────────────────────────┤
//! │  Row object model │ Row types, hkeys │
//! ├───────────────────┼─────────────────┤
//! │   Row codec (RowData / RowDef)       │
//! ├─────────────────────────────────────┤
//! │   Store adapter (groups, indexes)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`encoding`]: byte primitives and per-type field encodings
//! - [`rowdata`]: the binary row codec and row schemas
//! - [`hkey`]: hierarchical keys and segment comparisons
//! - [`types`]: scalar values and typed row identities
//! - [`exec`]: cursors, bindings, the operators and update plans
//! - [`store`]: the in-memory reference adapter
//!
//! SQL parsing and planning, the persistent store behind the adapter,
//! transactions and durability are outside this crate.

pub mod encoding;
pub mod error;
pub mod exec;
pub mod hkey;
pub mod rowdata;
pub mod store;
pub mod types;

pub use error::Error;
pub use exec::{Cursor, Row, SharedRow};
pub use hkey::{HKey, KeySegment};
pub use rowdata::{FieldDef, RowData, RowDef};
pub use types::{JoinType, RowType, Value};
