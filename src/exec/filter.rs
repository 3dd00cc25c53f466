//! # Select, Filter and Limit
//!
//! - [`Select`] evaluates a predicate over rows of one declared type in an
//!   hkey-ordered stream. Dropping a row drops its whole hkey subtree:
//!   descendants of a rejected row are discarded whatever their type.
//!   Rows of other types outside a rejected subtree pass through.
//! - [`Filter`] retains rows whose type is in a set, with no hkey logic.
//! - [`LimitRows`] forwards the first n rows and closes its input as the
//!   nth is emitted.

use hashbrown::HashSet;

use eyre::Result;

use crate::exec::adapter::AdapterRef;
use crate::exec::api::{Operator, OperatorRef};
use crate::exec::cursor::Cursor;
use crate::exec::expression::{is_true, ExpressionRef};
use crate::exec::row::SharedRow;
use crate::hkey::HKey;
use crate::types::RowType;

#[derive(Debug)]
pub struct Select {
    input: OperatorRef,
    predicate_row_type: RowType,
    predicate: ExpressionRef,
}

impl Select {
    pub fn new(input: OperatorRef, predicate_row_type: RowType, predicate: ExpressionRef) -> Self {
        Self {
            input,
            predicate_row_type,
            predicate,
        }
    }
}

impl Operator for Select {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(SelectCursor {
            input: self.input.cursor(adapter),
            predicate_row_type: self.predicate_row_type.clone(),
            predicate: self.predicate.clone(),
            rejected_subtree: None,
        })
    }
}

struct SelectCursor {
    input: Box<dyn Cursor>,
    predicate_row_type: RowType,
    predicate: ExpressionRef,
    rejected_subtree: Option<HKey>,
}

impl Cursor for SelectCursor {
    fn open(&mut self) -> Result<()> {
        self.rejected_subtree = None;
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            let row = match self.input.next()? {
                Some(row) => row,
                None => return Ok(None),
            };
            if let Some(rejected) = &self.rejected_subtree {
                match row.hkey() {
                    Some(hkey) if rejected.is_prefix_of(hkey) => continue,
                    _ => self.rejected_subtree = None,
                }
            }
            if *row.row_type() != self.predicate_row_type {
                return Ok(Some(row));
            }
            if is_true(&self.predicate.eval(row.as_ref())?) {
                return Ok(Some(row));
            }
            self.rejected_subtree = row.hkey().cloned();
        }
    }

    fn close(&mut self) -> Result<()> {
        self.rejected_subtree = None;
        self.input.close()
    }
}

#[derive(Debug)]
pub struct Filter {
    input: OperatorRef,
    keep_types: Vec<RowType>,
}

impl Filter {
    pub fn new(input: OperatorRef, keep_types: Vec<RowType>) -> Self {
        Self { input, keep_types }
    }
}

impl Operator for Filter {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(FilterCursor {
            input: self.input.cursor(adapter),
            keep_types: self.keep_types.iter().cloned().collect(),
        })
    }
}

struct FilterCursor {
    input: Box<dyn Cursor>,
    keep_types: HashSet<RowType>,
}

impl Cursor for FilterCursor {
    fn open(&mut self) -> Result<()> {
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            match self.input.next()? {
                None => return Ok(None),
                Some(row) => {
                    if self.keep_types.contains(row.row_type()) {
                        return Ok(Some(row));
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

#[derive(Debug)]
pub struct LimitRows {
    input: OperatorRef,
    rows: usize,
}

impl LimitRows {
    pub fn new(input: OperatorRef, rows: usize) -> Self {
        Self { input, rows }
    }
}

impl Operator for LimitRows {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(LimitRowsCursor {
            input: self.input.cursor(adapter),
            rows: self.rows,
            emitted: 0,
            input_closed: false,
        })
    }
}

struct LimitRowsCursor {
    input: Box<dyn Cursor>,
    rows: usize,
    emitted: usize,
    input_closed: bool,
}

impl Cursor for LimitRowsCursor {
    fn open(&mut self) -> Result<()> {
        self.emitted = 0;
        self.input_closed = false;
        if self.rows == 0 {
            self.input.open()?;
            self.input.close()?;
            self.input_closed = true;
            return Ok(());
        }
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        if self.emitted >= self.rows || self.input_closed {
            return Ok(None);
        }
        match self.input.next()? {
            None => Ok(None),
            Some(row) => {
                self.emitted += 1;
                if self.emitted == self.rows {
                    // The input is done for good; release it now rather
                    // than at our own close.
                    self.input.close()?;
                    self.input_closed = true;
                }
                Ok(Some(row))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.input_closed {
            return Ok(());
        }
        self.input_closed = true;
        self.input.close()
    }
}
