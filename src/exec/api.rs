//! # Operator Factory Surface
//!
//! One constructor per physical operator, plus the option enums, the
//! [`Limit`] strategy, sort [`Ordering`]s, and the single execution entry
//! point [`cursor`]. Plans are trees of [`OperatorRef`]s; executing a plan
//! means asking the root for a cursor against a store adapter and pulling
//! it.
//!
//! ```ignore
//! let plan = api::flatten_hkey_ordered(
//!     api::group_scan(group.clone(), api::no_limit()),
//!     customer.clone(),
//!     order.clone(),
//!     JoinType::Inner,
//!     &[],
//! );
//! let mut cursor = api::cursor(&plan, &adapter);
//! cursor.open()?;
//! while let Some(row) = cursor.next()? {
//!     // ...
//! }
//! cursor.close()?;
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::Arc;

use eyre::Result;

use crate::exec::adapter::{AdapterRef, GroupHandle, IndexKeyRange, StoreAdapter};
use crate::exec::aggregate::{Aggregate, AggregatorFactory, Count};
use crate::exec::cursor::{Cursor, TopLevelCursor};
use crate::exec::expression::ExpressionRef;
use crate::exec::filter::{Filter, LimitRows, Select};
use crate::exec::flatten::Flatten;
use crate::exec::join::{MapNestedLoops, ProductNestedLoops};
use crate::exec::lookup::{AncestorLookup, AncestorLookupNested, BranchLookup, BranchLookupNested};
use crate::exec::project::Project;
use crate::exec::row::{Row, SharedRow};
use crate::exec::scan::{GroupScan, GroupScanVariant, IndexScan, ValuesScan};
use crate::exec::sort::Sort;
use crate::exec::update::{DeletePlan, InsertPlan, PlannableRef, UpdateFunction, UpdatePlan};
use crate::types::{DerivedKind, JoinType, RowType, Value};

/// A physical operator: a node of a plan tree that can produce a cursor.
pub trait Operator: fmt::Debug + Send + Sync {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor>;
}

pub type OperatorRef = Arc<dyn Operator>;

/// Scan-termination strategy consulted row by row.
pub trait Limit: fmt::Debug + Send + Sync {
    fn limit_reached(&self, row: &dyn Row) -> bool;
}

pub type LimitRef = Arc<dyn Limit>;

/// The limit that never fires.
#[derive(Debug)]
pub struct NoLimit;

impl Limit for NoLimit {
    fn limit_reached(&self, _row: &dyn Row) -> bool {
        false
    }
}

pub fn no_limit() -> LimitRef {
    Arc::new(NoLimit)
}

/// Flatten output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenOption {
    KeepParent,
    KeepChild,
    LeftJoinShortensHKey,
}

/// Lookup input retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOption {
    KeepInput,
    DiscardInput,
}

/// Sort specification: expressions with per-column direction.
#[derive(Debug, Clone, Default)]
pub struct Ordering {
    columns: Vec<(ExpressionRef, bool)>,
}

impl Ordering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, expression: ExpressionRef, ascending: bool) {
        self.columns.push((expression, ascending));
    }

    pub fn sort_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn expression(&self, index: usize) -> &ExpressionRef {
        &self.columns[index].0
    }

    pub fn ascending(&self, index: usize) -> bool {
        self.columns[index].1
    }

    /// Evaluates the sort key vector of a row.
    pub fn eval_keys(&self, row: &dyn Row) -> Result<Vec<Value<'static>>> {
        self.columns
            .iter()
            .map(|(expression, _)| expression.eval(row))
            .collect()
    }

    /// Compares two key vectors under the per-column directions.
    pub fn compare_keys(&self, a: &[Value<'static>], b: &[Value<'static>]) -> CmpOrdering {
        for (index, (_, ascending)) in self.columns.iter().enumerate() {
            let cmp = a[index].cmp_total(&b[index]);
            let cmp = if *ascending { cmp } else { cmp.reverse() };
            if cmp != CmpOrdering::Equal {
                return cmp;
            }
        }
        CmpOrdering::Equal
    }
}

pub fn ordering() -> Ordering {
    Ordering::new()
}

// Scans

pub fn group_scan(group: GroupHandle, limit: LimitRef) -> OperatorRef {
    Arc::new(GroupScan::new(group, limit, GroupScanVariant::Full))
}

pub fn group_scan_positional(
    group: GroupHandle,
    limit: LimitRef,
    hkey_binding_position: usize,
    deep: bool,
) -> OperatorRef {
    Arc::new(GroupScan::new(
        group,
        limit,
        GroupScanVariant::Positional {
            hkey_binding_position,
            deep,
        },
    ))
}

pub fn index_scan(
    index_type: RowType,
    reverse: bool,
    range: IndexKeyRange,
    inner_join_until: Option<RowType>,
) -> OperatorRef {
    Arc::new(IndexScan::new(index_type, reverse, range, inner_join_until))
}

pub fn values_scan(rows: Vec<SharedRow>, row_type: RowType) -> OperatorRef {
    Arc::new(ValuesScan::new(rows, row_type))
}

// Lookups

pub fn ancestor_lookup(
    input: OperatorRef,
    group: GroupHandle,
    row_type: RowType,
    ancestor_types: Vec<RowType>,
    flag: LookupOption,
) -> OperatorRef {
    Arc::new(AncestorLookup::new(
        input,
        group,
        row_type,
        ancestor_types,
        flag,
    ))
}

pub fn ancestor_lookup_nested(
    group: GroupHandle,
    row_type: RowType,
    ancestor_types: Vec<RowType>,
    hkey_binding_position: usize,
) -> OperatorRef {
    Arc::new(AncestorLookupNested::new(
        group,
        row_type,
        ancestor_types,
        hkey_binding_position,
    ))
}

pub fn branch_lookup(
    input: OperatorRef,
    group: GroupHandle,
    input_row_type: RowType,
    output_row_type: RowType,
    flag: LookupOption,
    limit: LimitRef,
) -> OperatorRef {
    Arc::new(BranchLookup::new(
        input,
        group,
        input_row_type,
        output_row_type,
        flag,
        limit,
    ))
}

pub fn branch_lookup_nested(
    group: GroupHandle,
    input_row_type: RowType,
    output_row_type: RowType,
    flag: LookupOption,
    binding_position: usize,
) -> OperatorRef {
    Arc::new(BranchLookupNested::new(
        group,
        input_row_type,
        output_row_type,
        flag,
        binding_position,
    ))
}

// Flatten

pub fn flatten_hkey_ordered(
    input: OperatorRef,
    parent_type: RowType,
    child_type: RowType,
    join: JoinType,
    flags: &[FlattenOption],
) -> OperatorRef {
    Arc::new(Flatten::new(input, parent_type, child_type, join, flags))
}

// Joins

pub fn product_nested_loops(
    outer: OperatorRef,
    inner: OperatorRef,
    outer_type: RowType,
    inner_type: RowType,
    binding_position: usize,
) -> OperatorRef {
    Arc::new(ProductNestedLoops::new(
        outer,
        inner,
        outer_type,
        inner_type,
        binding_position,
    ))
}

pub fn map_nested_loops(
    outer: OperatorRef,
    inner: OperatorRef,
    binding_position: usize,
) -> OperatorRef {
    Arc::new(MapNestedLoops::new(outer, inner, None, None, binding_position))
}

pub fn map_nested_loops_outer(
    outer: OperatorRef,
    inner: OperatorRef,
    outer_join_row_type: RowType,
    outer_join_expressions: Vec<ExpressionRef>,
    binding_position: usize,
) -> OperatorRef {
    Arc::new(MapNestedLoops::new(
        outer,
        inner,
        Some(outer_join_row_type),
        Some(outer_join_expressions),
        binding_position,
    ))
}

// Select and filter

pub fn select_hkey_ordered(
    input: OperatorRef,
    predicate_row_type: RowType,
    predicate: ExpressionRef,
) -> OperatorRef {
    Arc::new(Select::new(input, predicate_row_type, predicate))
}

pub fn filter(input: OperatorRef, keep_types: Vec<RowType>) -> OperatorRef {
    Arc::new(Filter::new(input, keep_types))
}

// Projection

pub fn project(
    input: OperatorRef,
    row_type: RowType,
    expressions: Vec<ExpressionRef>,
) -> OperatorRef {
    let output = RowType::derived(DerivedKind::Projected, row_type.type_id(), expressions.len());
    Arc::new(Project::new(input, row_type, output, expressions))
}

pub fn project_table(
    input: OperatorRef,
    input_row_type: RowType,
    output_row_type: RowType,
    expressions: Vec<ExpressionRef>,
) -> OperatorRef {
    Arc::new(Project::new(
        input,
        input_row_type,
        output_row_type,
        expressions,
    ))
}

// Sort

pub fn sort_insertion_limited(
    input: OperatorRef,
    sort_type: RowType,
    ordering: Ordering,
    limit: usize,
) -> OperatorRef {
    Arc::new(Sort::new(input, sort_type, ordering, Some(limit)))
}

pub fn sort_tree(input: OperatorRef, sort_type: RowType, ordering: Ordering) -> OperatorRef {
    Arc::new(Sort::new(input, sort_type, ordering, None))
}

// Aggregation

pub fn aggregate_partial(
    input: OperatorRef,
    grouping_fields: usize,
    factory: Arc<dyn AggregatorFactory>,
    aggregator_names: Vec<String>,
) -> OperatorRef {
    Arc::new(Aggregate::new(
        input,
        grouping_fields,
        factory,
        aggregator_names,
    ))
}

pub fn count(input: OperatorRef, count_type: RowType) -> OperatorRef {
    Arc::new(Count::new(input, count_type))
}

// Limit

pub fn limit(input: OperatorRef, rows: usize) -> OperatorRef {
    Arc::new(LimitRows::new(input, rows))
}

// Update plans

pub fn insert(input: OperatorRef) -> PlannableRef {
    Arc::new(InsertPlan::new(input))
}

pub fn update(input: OperatorRef, update_function: Arc<dyn UpdateFunction>) -> PlannableRef {
    Arc::new(UpdatePlan::new(input, update_function))
}

pub fn delete(input: OperatorRef) -> PlannableRef {
    Arc::new(DeletePlan::new(input))
}

// Execution entry point

/// Wraps the root operator's cursor in the top-level guard that owns
/// close-once semantics and the binding lifecycle.
pub fn cursor(root: &OperatorRef, adapter: &AdapterRef) -> TopLevelCursor {
    TopLevelCursor::new(root.cursor(adapter), adapter.bindings())
}
