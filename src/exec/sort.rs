//! # Sort
//!
//! One operator covers both sort shapes. With a capacity, it is the
//! bounded-memory top-N insertion sort: a container of at most `limit`
//! rows kept ordered by binary-search insertion, discarding the overflow
//! from the bottom. Without one, it is the unbounded sort: everything is
//! collected and stably sorted on first pull.
//!
//! Only rows of the sort type participate. Rows of any other type bypass
//! the sort and are emitted after the sorted batch, in arrival order.
//! Draining happens on the first `next` after open; the input is closed as
//! soon as it is exhausted.

use std::collections::VecDeque;

use eyre::Result;

use crate::exec::adapter::AdapterRef;
use crate::exec::api::{Operator, OperatorRef, Ordering};
use crate::exec::cursor::Cursor;
use crate::exec::row::SharedRow;
use crate::types::{RowType, Value};

#[derive(Debug)]
pub struct Sort {
    input: OperatorRef,
    sort_type: RowType,
    ordering: Ordering,
    limit: Option<usize>,
}

impl Sort {
    pub fn new(
        input: OperatorRef,
        sort_type: RowType,
        ordering: Ordering,
        limit: Option<usize>,
    ) -> Self {
        Self {
            input,
            sort_type,
            ordering,
            limit,
        }
    }
}

impl Operator for Sort {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(SortCursor {
            input: self.input.cursor(adapter),
            sort_type: self.sort_type.clone(),
            ordering: self.ordering.clone(),
            limit: self.limit,
            sorted: Vec::new(),
            bypass: VecDeque::new(),
            emit_index: 0,
            loaded: false,
            input_open: false,
        })
    }
}

struct SortCursor {
    input: Box<dyn Cursor>,
    sort_type: RowType,
    ordering: Ordering,
    limit: Option<usize>,
    sorted: Vec<(Vec<Value<'static>>, SharedRow)>,
    bypass: VecDeque<SharedRow>,
    emit_index: usize,
    loaded: bool,
    input_open: bool,
}

impl SortCursor {
    /// Binary-search insertion keeping ties in arrival order.
    fn insert_limited(&mut self, keys: Vec<Value<'static>>, row: SharedRow, limit: usize) {
        if limit == 0 {
            return;
        }
        let position = self
            .sorted
            .partition_point(|(existing, _)| {
                self.ordering.compare_keys(existing, &keys) != std::cmp::Ordering::Greater
            });
        if position == limit {
            return;
        }
        self.sorted.insert(position, (keys, row));
        if self.sorted.len() > limit {
            self.sorted.pop();
        }
    }

    fn load(&mut self) -> Result<()> {
        while let Some(row) = self.input.next()? {
            if *row.row_type() != self.sort_type {
                self.bypass.push_back(row);
                continue;
            }
            let keys = self.ordering.eval_keys(row.as_ref())?;
            match self.limit {
                Some(limit) => self.insert_limited(keys, row, limit),
                None => self.sorted.push((keys, row)),
            }
        }
        if self.limit.is_none() {
            let ordering = self.ordering.clone();
            self.sorted
                .sort_by(|(a, _), (b, _)| ordering.compare_keys(a, b));
        }
        self.input.close()?;
        self.input_open = false;
        self.loaded = true;
        Ok(())
    }
}

impl Cursor for SortCursor {
    fn open(&mut self) -> Result<()> {
        self.sorted.clear();
        self.bypass.clear();
        self.emit_index = 0;
        self.loaded = false;
        self.input.open()?;
        self.input_open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        if !self.loaded {
            self.load()?;
        }
        if self.emit_index < self.sorted.len() {
            let row = self.sorted[self.emit_index].1.clone();
            self.emit_index += 1;
            return Ok(Some(row));
        }
        Ok(self.bypass.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.sorted.clear();
        self.bypass.clear();
        self.loaded = true;
        if self.input_open {
            self.input_open = false;
            return self.input.close();
        }
        Ok(())
    }
}
