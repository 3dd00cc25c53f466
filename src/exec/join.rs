//! # Nested-Loop Operators
//!
//! Both operators here drive an inner plan once per outer row, passing the
//! outer row through a binding position and re-opening the inner cursor so
//! positional scans and nested lookups under it see the new binding.
//!
//! - [`ProductNestedLoops`] emits the cross of each outer row with the
//!   inner rows of the declared type.
//! - [`MapNestedLoops`] pipes: the inner cursor's output is the output.
//!   With an outer-join row type configured, an outer row whose inner
//!   produced nothing yields exactly one synthesized row instead.

use std::sync::Arc;

use eyre::Result;

use crate::exec::adapter::{AdapterRef, StoreAdapter};
use crate::exec::api::{Operator, OperatorRef};
use crate::exec::cursor::{BindingsRef, Cursor};
use crate::exec::expression::ExpressionRef;
use crate::exec::row::{FlattenedRow, SharedRow, ValuesRow};
use crate::types::RowType;

#[derive(Debug)]
pub struct ProductNestedLoops {
    outer: OperatorRef,
    inner: OperatorRef,
    outer_type: RowType,
    inner_type: RowType,
    binding_position: usize,
}

impl ProductNestedLoops {
    pub fn new(
        outer: OperatorRef,
        inner: OperatorRef,
        outer_type: RowType,
        inner_type: RowType,
        binding_position: usize,
    ) -> Self {
        Self {
            outer,
            inner,
            outer_type,
            inner_type,
            binding_position,
        }
    }
}

impl Operator for ProductNestedLoops {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(ProductNestedLoopsCursor {
            outer: self.outer.cursor(adapter),
            inner: self.inner.cursor(adapter),
            bindings: adapter.bindings(),
            outer_type: self.outer_type.clone(),
            inner_type: self.inner_type.clone(),
            product_type: RowType::product(self.outer_type.clone(), self.inner_type.clone()),
            binding_position: self.binding_position,
            current_outer: None,
            inner_active: false,
        })
    }
}

struct ProductNestedLoopsCursor {
    outer: Box<dyn Cursor>,
    inner: Box<dyn Cursor>,
    bindings: BindingsRef,
    outer_type: RowType,
    inner_type: RowType,
    product_type: RowType,
    binding_position: usize,
    current_outer: Option<SharedRow>,
    inner_active: bool,
}

impl Cursor for ProductNestedLoopsCursor {
    fn open(&mut self) -> Result<()> {
        self.current_outer = None;
        self.inner_active = false;
        self.outer.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            if self.inner_active {
                while let Some(inner_row) = self.inner.next()? {
                    if *inner_row.row_type() != self.inner_type {
                        continue;
                    }
                    let outer = self
                        .current_outer
                        .clone()
                        .ok_or_else(|| eyre::eyre!("product inner active without an outer row"))?;
                    let hkey = outer.hkey().cloned().unwrap_or_default();
                    let product = FlattenedRow::new(
                        self.product_type.clone(),
                        Some(outer),
                        Some(inner_row),
                        hkey,
                        self.outer_type.n_fields(),
                    );
                    return Ok(Some(Arc::new(product)));
                }
                self.inner.close()?;
                self.inner_active = false;
                self.current_outer = None;
            }
            match self.outer.next()? {
                None => return Ok(None),
                Some(row) => {
                    if *row.row_type() == self.outer_type {
                        self.bindings
                            .lock()
                            .set_row(self.binding_position, row.clone());
                        self.current_outer = Some(row);
                        self.inner.open()?;
                        self.inner_active = true;
                    } else {
                        return Ok(Some(row));
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.inner_active {
            self.inner.close()?;
            self.inner_active = false;
        }
        self.current_outer = None;
        self.bindings.lock().unset(self.binding_position);
        self.outer.close()
    }
}

#[derive(Debug)]
pub struct MapNestedLoops {
    outer: OperatorRef,
    inner: OperatorRef,
    outer_join_row_type: Option<RowType>,
    outer_join_expressions: Option<Vec<ExpressionRef>>,
    binding_position: usize,
}

impl MapNestedLoops {
    pub fn new(
        outer: OperatorRef,
        inner: OperatorRef,
        outer_join_row_type: Option<RowType>,
        outer_join_expressions: Option<Vec<ExpressionRef>>,
        binding_position: usize,
    ) -> Self {
        Self {
            outer,
            inner,
            outer_join_row_type,
            outer_join_expressions,
            binding_position,
        }
    }
}

impl Operator for MapNestedLoops {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(MapNestedLoopsCursor {
            outer: self.outer.cursor(adapter),
            inner: self.inner.cursor(adapter),
            bindings: adapter.bindings(),
            outer_join_row_type: self.outer_join_row_type.clone(),
            outer_join_expressions: self.outer_join_expressions.clone(),
            binding_position: self.binding_position,
            current_outer: None,
            inner_active: false,
            inner_was_empty: false,
        })
    }
}

struct MapNestedLoopsCursor {
    outer: Box<dyn Cursor>,
    inner: Box<dyn Cursor>,
    bindings: BindingsRef,
    outer_join_row_type: Option<RowType>,
    outer_join_expressions: Option<Vec<ExpressionRef>>,
    binding_position: usize,
    current_outer: Option<SharedRow>,
    inner_active: bool,
    inner_was_empty: bool,
}

impl MapNestedLoopsCursor {
    /// The single substitute row for an outer row whose inner loop was
    /// empty: the configured type, fields computed against the outer row.
    fn outer_join_row(&self, outer: &SharedRow) -> Result<SharedRow> {
        let row_type = self
            .outer_join_row_type
            .clone()
            .ok_or_else(|| eyre::eyre!("outer join row requested without a row type"))?;
        let expressions = self
            .outer_join_expressions
            .as_ref()
            .ok_or_else(|| eyre::eyre!("outer join row requested without expressions"))?;
        let values = expressions
            .iter()
            .map(|e| e.eval(outer.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(ValuesRow::with_hkey(
            row_type,
            values,
            outer.hkey().cloned(),
        )))
    }
}

impl Cursor for MapNestedLoopsCursor {
    fn open(&mut self) -> Result<()> {
        self.current_outer = None;
        self.inner_active = false;
        self.inner_was_empty = false;
        self.outer.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            if self.inner_active {
                if let Some(row) = self.inner.next()? {
                    self.inner_was_empty = false;
                    return Ok(Some(row));
                }
                self.inner.close()?;
                self.inner_active = false;
                if self.inner_was_empty && self.outer_join_row_type.is_some() {
                    let outer = self
                        .current_outer
                        .clone()
                        .ok_or_else(|| eyre::eyre!("map inner active without an outer row"))?;
                    return Ok(Some(self.outer_join_row(&outer)?));
                }
            }
            match self.outer.next()? {
                None => return Ok(None),
                Some(row) => {
                    self.bindings
                        .lock()
                        .set_row(self.binding_position, row.clone());
                    self.current_outer = Some(row);
                    self.inner.open()?;
                    self.inner_active = true;
                    self.inner_was_empty = true;
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.inner_active {
            self.inner.close()?;
            self.inner_active = false;
        }
        self.current_outer = None;
        self.bindings.lock().unset(self.binding_position);
        self.outer.close()
    }
}
