//! # Row Object Model
//!
//! [`Row`] is the uniform face of everything a cursor can emit: codec-backed
//! table rows, index entries, flattened parent/child pairs and synthesized
//! value rows. Rows are shared between operators as [`SharedRow`]; once a
//! cursor has emitted a row it is immutable, so downstream operators may
//! hold on to it across pulls without copying.

use std::fmt;
use std::sync::Arc;

use eyre::{bail, ensure, Result};

use crate::hkey::HKey;
use crate::rowdata::RowData;
use crate::types::{RowType, Value};

pub trait Row: fmt::Debug + Send + Sync {
    fn row_type(&self) -> &RowType;

    fn hkey(&self) -> Option<&HKey>;

    fn field(&self, index: usize) -> Result<Value<'static>>;

    /// True when `other` lies in the hkey subtree rooted at this row.
    fn ancestor_of(&self, other: &dyn Row) -> bool {
        match (self.hkey(), other.hkey()) {
            (Some(a), Some(b)) => a.is_prefix_of(b),
            _ => false,
        }
    }
}

pub type SharedRow = Arc<dyn Row>;

/// A stored table row backed by its binary image.
#[derive(Debug)]
pub struct TableRow {
    row_type: RowType,
    data: RowData,
}

impl TableRow {
    pub fn new(row_type: RowType, data: RowData) -> Result<Self> {
        ensure!(
            row_type.as_table().is_some(),
            "table row constructed with non-table type {}",
            row_type
        );
        Ok(Self { row_type, data })
    }

    pub fn data(&self) -> &RowData {
        &self.data
    }
}

impl Row for TableRow {
    fn row_type(&self) -> &RowType {
        &self.row_type
    }

    fn hkey(&self) -> Option<&HKey> {
        self.data.hkey()
    }

    fn field(&self, index: usize) -> Result<Value<'static>> {
        match &self.row_type {
            RowType::Table(t) => self.data.field_value(&t.row_def, index),
            _ => bail!("table row with non-table type {}", self.row_type),
        }
    }
}

/// One entry of a secondary index: the key column values plus the hkey of
/// the indexed table row.
#[derive(Debug)]
pub struct IndexRow {
    row_type: RowType,
    values: Vec<Value<'static>>,
    hkey: HKey,
}

impl IndexRow {
    pub fn new(row_type: RowType, values: Vec<Value<'static>>, hkey: HKey) -> Result<Self> {
        ensure!(
            row_type.as_index().is_some(),
            "index row constructed with non-index type {}",
            row_type
        );
        Ok(Self {
            row_type,
            values,
            hkey,
        })
    }

    pub fn key_values(&self) -> &[Value<'static>] {
        &self.values
    }
}

impl Row for IndexRow {
    fn row_type(&self) -> &RowType {
        &self.row_type
    }

    fn hkey(&self) -> Option<&HKey> {
        Some(&self.hkey)
    }

    fn field(&self, index: usize) -> Result<Value<'static>> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| eyre::eyre!("no field {} in index row of {}", index, self.values.len()))
    }
}

/// A parent/child pair produced by flatten or product. Either side may be
/// absent for outer joins; absent-side fields read as `Null`.
#[derive(Debug)]
pub struct FlattenedRow {
    row_type: RowType,
    parent: Option<SharedRow>,
    child: Option<SharedRow>,
    hkey: HKey,
    parent_fields: usize,
}

impl FlattenedRow {
    pub fn new(
        row_type: RowType,
        parent: Option<SharedRow>,
        child: Option<SharedRow>,
        hkey: HKey,
        parent_fields: usize,
    ) -> Self {
        Self {
            row_type,
            parent,
            child,
            hkey,
            parent_fields,
        }
    }

    pub fn parent(&self) -> Option<&SharedRow> {
        self.parent.as_ref()
    }

    pub fn child(&self) -> Option<&SharedRow> {
        self.child.as_ref()
    }
}

impl Row for FlattenedRow {
    fn row_type(&self) -> &RowType {
        &self.row_type
    }

    fn hkey(&self) -> Option<&HKey> {
        Some(&self.hkey)
    }

    fn field(&self, index: usize) -> Result<Value<'static>> {
        if index < self.parent_fields {
            match &self.parent {
                Some(parent) => parent.field(index),
                None => Ok(Value::Null),
            }
        } else {
            match &self.child {
                Some(child) => child.field(index - self.parent_fields),
                None => Ok(Value::Null),
            }
        }
    }
}

/// A row materialized from plain values: values scans, projections,
/// aggregate and count outputs, and outer-join synthesis.
#[derive(Debug)]
pub struct ValuesRow {
    row_type: RowType,
    values: Vec<Value<'static>>,
    hkey: Option<HKey>,
}

impl ValuesRow {
    pub fn new(row_type: RowType, values: Vec<Value<'static>>) -> Self {
        Self {
            row_type,
            values,
            hkey: None,
        }
    }

    pub fn with_hkey(row_type: RowType, values: Vec<Value<'static>>, hkey: Option<HKey>) -> Self {
        Self {
            row_type,
            values,
            hkey,
        }
    }
}

impl Row for ValuesRow {
    fn row_type(&self) -> &RowType {
        &self.row_type
    }

    fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_ref()
    }

    fn field(&self, index: usize) -> Result<Value<'static>> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| eyre::eyre!("no field {} in row of {}", index, self.values.len()))
    }
}
