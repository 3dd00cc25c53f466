//! # Query Execution - Pull-Based Operator Tree
//!
//! A plan is a tree of physical operators. Each operator, given a store
//! adapter, produces a cursor implementing `open` / `next` / `close`; each
//! `next` call propagates down the tree, pulling rows from children.
//! Execution is single-threaded cooperative: `next` returns synchronously
//! and only the adapter may block.
//!
//! ## Operator Tree
//!
//! ```text
//! TopLevelCursor
//!     └── Flatten (hkey-ordered)
//!             └── Select (hkey-ordered)
//!                     └── GroupScan
//!                             └── [store adapter]
//! ```
//!
//! ## Ordering Contracts
//!
//! Operators documented as hkey-ordered require hkey-ordered input and
//! preserve it. Sorts impose a new order; hkey-dependent operators must
//! not be placed downstream of one. Aggregation requires input grouped on
//! its leading fields.
//!
//! ## Module Structure
//!
//! - `api`: the factory surface and execution entry point
//! - `cursor`: the cursor protocol, bindings and the root guard
//! - `row` / `expression`: the row object model and scalar contract
//! - `adapter`: the store adapter contract
//! - `scan`, `lookup`, `flatten`, `join`, `filter`, `project`, `sort`,
//!   `aggregate`, `update`: the operators themselves

pub mod adapter;
pub mod aggregate;
pub mod api;
pub mod cursor;
pub mod expression;
pub mod filter;
pub mod flatten;
pub mod join;
pub mod lookup;
pub mod project;
pub mod row;
pub mod scan;
pub mod sort;
pub mod update;

pub use adapter::{AdapterRef, GroupHandle, IndexKeyRange, RowStream, StoreAdapter};
pub use aggregate::{basic_aggregators, count_row_type, Aggregator, AggregatorFactory};
pub use api::{
    cursor, no_limit, ordering, FlattenOption, Limit, LimitRef, LookupOption, NoLimit, Operator,
    OperatorRef, Ordering,
};
pub use cursor::{new_bindings, Bindings, BindingsRef, BindingValue, Cursor, TopLevelCursor};
pub use expression::{field, func, is_true, literal, Expression, ExpressionRef};
pub use row::{FlattenedRow, IndexRow, Row, SharedRow, TableRow, ValuesRow};
pub use update::{UpdateFunction, UpdatePlannable, UpdateResult};
