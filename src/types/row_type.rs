//! # Row Types
//!
//! Typed identities for the rows operators emit. A table scan emits rows
//! of a table type, an index scan emits index-row types, and composite
//! operators derive new identities: flatten joins a parent and a child
//! type, product crosses two types, and projection / aggregation / count /
//! values scans emit derived types.
//!
//! Table and index types compare by their identifiers. Flattened types are
//! equal exactly when their parent type, child type and join variant are
//! equal; the remaining composites are structural as well.

use std::fmt;
use std::sync::Arc;

use eyre::{bail, Result};

use crate::rowdata::schema::RowDef;

/// Join variant of a flatten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

/// Identity of a stored table's rows within its group.
#[derive(Debug)]
pub struct TableRowType {
    pub table_id: i32,
    pub group_id: i32,
    pub name: String,
    /// Ordinal of this table inside its group's hkeys.
    pub ordinal: u16,
    /// Depth in the group tree; the root table has depth 0.
    pub depth: usize,
    /// Number of hkey segments identifying a row of this table.
    pub hkey_segments: usize,
    pub row_def: Arc<RowDef>,
}

impl PartialEq for TableRowType {
    fn eq(&self, other: &Self) -> bool {
        self.table_id == other.table_id
    }
}

impl Eq for TableRowType {}

impl std::hash::Hash for TableRowType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.table_id.hash(state);
    }
}

/// Identity of an index's entries. Carries the indexed table type so scans
/// can report how deep index rows are considered joined.
#[derive(Debug)]
pub struct IndexRowType {
    pub index_id: i32,
    pub name: String,
    pub table: Arc<TableRowType>,
    pub key_fields: usize,
}

impl PartialEq for IndexRowType {
    fn eq(&self, other: &Self) -> bool {
        self.index_id == other.index_id
    }
}

impl Eq for IndexRowType {}

impl std::hash::Hash for IndexRowType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index_id.hash(state);
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FlattenedRowType {
    pub parent: RowType,
    pub child: RowType,
    pub join: JoinType,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProductRowType {
    pub left: RowType,
    pub right: RowType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedKind {
    Values,
    Projected,
    Aggregate,
    Count,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DerivedRowType {
    pub kind: DerivedKind,
    pub id: i32,
    pub fields: usize,
}

/// Cheaply clonable typed identity of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowType {
    Table(Arc<TableRowType>),
    Index(Arc<IndexRowType>),
    Flattened(Arc<FlattenedRowType>),
    Product(Arc<ProductRowType>),
    Derived(Arc<DerivedRowType>),
}

impl RowType {
    #[allow(clippy::too_many_arguments)]
    pub fn table(
        table_id: i32,
        group_id: i32,
        name: impl Into<String>,
        ordinal: u16,
        depth: usize,
        hkey_segments: usize,
        row_def: Arc<RowDef>,
    ) -> RowType {
        RowType::Table(Arc::new(TableRowType {
            table_id,
            group_id,
            name: name.into(),
            ordinal,
            depth,
            hkey_segments,
            row_def,
        }))
    }

    pub fn index(
        index_id: i32,
        name: impl Into<String>,
        table: &RowType,
        key_fields: usize,
    ) -> Result<RowType> {
        let table = match table {
            RowType::Table(t) => Arc::clone(t),
            other => bail!("index row type over non-table type {}", other),
        };
        Ok(RowType::Index(Arc::new(IndexRowType {
            index_id,
            name: name.into(),
            table,
            key_fields,
        })))
    }

    pub fn flattened(parent: RowType, child: RowType, join: JoinType) -> RowType {
        RowType::Flattened(Arc::new(FlattenedRowType {
            parent,
            child,
            join,
        }))
    }

    pub fn product(left: RowType, right: RowType) -> RowType {
        RowType::Product(Arc::new(ProductRowType { left, right }))
    }

    pub fn derived(kind: DerivedKind, id: i32, fields: usize) -> RowType {
        RowType::Derived(Arc::new(DerivedRowType { kind, id, fields }))
    }

    pub fn values(id: i32, fields: usize) -> RowType {
        RowType::derived(DerivedKind::Values, id, fields)
    }

    /// Number of fields a row of this type exposes.
    pub fn n_fields(&self) -> usize {
        match self {
            RowType::Table(t) => t.row_def.field_count(),
            RowType::Index(i) => i.key_fields,
            RowType::Flattened(f) => f.parent.n_fields() + f.child.n_fields(),
            RowType::Product(p) => p.left.n_fields() + p.right.n_fields(),
            RowType::Derived(d) => d.fields,
        }
    }

    /// Hkey segment count of the storage-backed type this row identifies,
    /// when there is one.
    pub fn hkey_segment_count(&self) -> Option<usize> {
        match self {
            RowType::Table(t) => Some(t.hkey_segments),
            RowType::Index(i) => Some(i.table.hkey_segments),
            RowType::Flattened(f) => f.child.hkey_segment_count(),
            RowType::Product(p) => p.left.hkey_segment_count(),
            RowType::Derived(_) => None,
        }
    }

    /// Group ordinal of the deepest table behind this type.
    pub fn leaf_ordinal(&self) -> Option<u16> {
        match self {
            RowType::Table(t) => Some(t.ordinal),
            RowType::Index(i) => Some(i.table.ordinal),
            RowType::Flattened(f) => f.child.leaf_ordinal(),
            RowType::Product(p) => p.right.leaf_ordinal(),
            RowType::Derived(_) => None,
        }
    }

    /// Identifier for derived-type synthesis.
    pub fn type_id(&self) -> i32 {
        match self {
            RowType::Table(t) => t.table_id,
            RowType::Index(i) => i.index_id,
            RowType::Flattened(f) => f.child.type_id(),
            RowType::Product(p) => p.left.type_id(),
            RowType::Derived(d) => d.id,
        }
    }

    pub fn as_table(&self) -> Option<&Arc<TableRowType>> {
        match self {
            RowType::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<&Arc<IndexRowType>> {
        match self {
            RowType::Index(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowType::Table(t) => write!(f, "{}", t.name),
            RowType::Index(i) => write!(f, "{}", i.name),
            RowType::Flattened(ft) => {
                write!(f, "flatten({} {:?} {})", ft.parent, ft.join, ft.child)
            }
            RowType::Product(p) => write!(f, "product({}, {})", p.left, p.right),
            RowType::Derived(d) => write!(f, "{:?}#{}", d.kind, d.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowdata::schema::RowDef;

    fn table(id: i32, ordinal: u16, depth: usize) -> RowType {
        RowType::table(
            id,
            1,
            format!("t{}", id),
            ordinal,
            depth,
            (depth + 1) * 2,
            Arc::new(RowDef::new(id, vec![])),
        )
    }

    #[test]
    fn table_types_compare_by_id() {
        let a = table(1, 1, 0);
        let b = RowType::table(
            1,
            9,
            "renamed",
            3,
            2,
            6,
            Arc::new(RowDef::new(1, vec![])),
        );
        assert_eq!(a, b);
        assert_ne!(a, table(2, 1, 0));
    }

    #[test]
    fn flattened_types_equal_on_parent_child_and_join() {
        let parent = table(1, 1, 0);
        let child = table(2, 2, 1);
        let a = RowType::flattened(parent.clone(), child.clone(), JoinType::Inner);
        let b = RowType::flattened(parent.clone(), child.clone(), JoinType::Inner);
        let c = RowType::flattened(parent.clone(), child.clone(), JoinType::Left);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, RowType::flattened(child, parent, JoinType::Inner));
    }

    #[test]
    fn composite_field_counts_add_up() {
        let parent = RowType::table(
            1,
            1,
            "p",
            1,
            0,
            2,
            Arc::new(RowDef::new(1, vec![])),
        );
        let derived = RowType::values(7, 3);
        assert_eq!(derived.n_fields(), 3);
        let flat = RowType::flattened(derived.clone(), RowType::values(8, 2), JoinType::Inner);
        assert_eq!(flat.n_fields(), 5);
        assert_eq!(parent.n_fields(), 0);
    }
}
