//! # Scan Operators
//!
//! Leaf operators that pull rows out of the store or out of memory:
//!
//! - [`GroupScan`]: all rows of a group in hkey order, either the full
//!   group or positioned at an hkey taken from a binding.
//! - [`IndexScan`]: index entries of a half-open key range in index order.
//! - [`ValuesScan`]: a fixed collection, emitted once in iteration order.

use std::sync::Arc;

use eyre::Result;

use crate::exec::adapter::{AdapterRef, GroupHandle, IndexKeyRange, RowStream, StoreAdapter};
use crate::exec::api::{LimitRef, Operator};
use crate::exec::cursor::Cursor;
use crate::exec::row::SharedRow;
use crate::types::RowType;

#[derive(Debug, Clone, Copy)]
pub enum GroupScanVariant {
    /// Scan the entire group.
    Full,
    /// Open at the hkey found at a binding position; `deep` selects the
    /// whole subtree under it rather than only immediate children.
    Positional {
        hkey_binding_position: usize,
        deep: bool,
    },
}

#[derive(Debug)]
pub struct GroupScan {
    group: GroupHandle,
    limit: LimitRef,
    variant: GroupScanVariant,
}

impl GroupScan {
    pub fn new(group: GroupHandle, limit: LimitRef, variant: GroupScanVariant) -> Self {
        Self {
            group,
            limit,
            variant,
        }
    }
}

impl Operator for GroupScan {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(GroupScanCursor {
            adapter: Arc::clone(adapter),
            group: self.group.clone(),
            limit: Arc::clone(&self.limit),
            variant: self.variant,
            stream: None,
            done: false,
        })
    }
}

struct GroupScanCursor {
    adapter: AdapterRef,
    group: GroupHandle,
    limit: LimitRef,
    variant: GroupScanVariant,
    stream: Option<RowStream>,
    done: bool,
}

impl Cursor for GroupScanCursor {
    fn open(&mut self) -> Result<()> {
        self.done = false;
        self.stream = Some(match self.variant {
            GroupScanVariant::Full => self.adapter.group_cursor(&self.group, None, true)?,
            GroupScanVariant::Positional {
                hkey_binding_position,
                deep,
            } => {
                // The binding is read at open time so a re-open under a new
                // outer row repositions the scan.
                let hkey = self
                    .adapter
                    .bindings()
                    .lock()
                    .hkey_at(hkey_binding_position)?;
                self.adapter.group_cursor(&self.group, Some(&hkey), deep)?
            }
        });
        Ok(())
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        if self.done {
            return Ok(None);
        }
        let row = match self.stream.as_mut().and_then(Iterator::next) {
            Some(row) => row?,
            None => {
                self.done = true;
                self.stream = None;
                return Ok(None);
            }
        };
        if self.limit.limit_reached(row.as_ref()) {
            self.done = true;
            self.stream = None;
            return Ok(None);
        }
        Ok(Some(row))
    }

    fn close(&mut self) -> Result<()> {
        self.stream = None;
        self.done = true;
        Ok(())
    }
}

#[derive(Debug)]
pub struct IndexScan {
    index_type: RowType,
    reverse: bool,
    range: IndexKeyRange,
    inner_join_until: Option<RowType>,
}

impl IndexScan {
    pub fn new(
        index_type: RowType,
        reverse: bool,
        range: IndexKeyRange,
        inner_join_until: Option<RowType>,
    ) -> Self {
        Self {
            index_type,
            reverse,
            range,
            inner_join_until,
        }
    }
}

impl Operator for IndexScan {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(IndexScanCursor {
            adapter: Arc::clone(adapter),
            index_type: self.index_type.clone(),
            reverse: self.reverse,
            range: self.range.clone(),
            inner_join_until: self.inner_join_until.clone(),
            stream: None,
        })
    }
}

struct IndexScanCursor {
    adapter: AdapterRef,
    index_type: RowType,
    reverse: bool,
    range: IndexKeyRange,
    inner_join_until: Option<RowType>,
    stream: Option<RowStream>,
}

impl Cursor for IndexScanCursor {
    fn open(&mut self) -> Result<()> {
        self.stream = Some(self.adapter.index_cursor(
            &self.index_type,
            &self.range,
            self.reverse,
            self.inner_join_until.as_ref(),
        )?);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        match self.stream.as_mut().and_then(Iterator::next) {
            Some(row) => Ok(Some(row?)),
            None => {
                self.stream = None;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.stream = None;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ValuesScan {
    rows: Arc<Vec<SharedRow>>,
    #[allow(dead_code)]
    row_type: RowType,
}

impl ValuesScan {
    pub fn new(rows: Vec<SharedRow>, row_type: RowType) -> Self {
        Self {
            rows: Arc::new(rows),
            row_type,
        }
    }
}

impl Operator for ValuesScan {
    fn cursor(&self, _adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(ValuesScanCursor {
            rows: Arc::clone(&self.rows),
            position: 0,
        })
    }
}

struct ValuesScanCursor {
    rows: Arc<Vec<SharedRow>>,
    position: usize,
}

impl Cursor for ValuesScanCursor {
    fn open(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        match self.rows.get(self.position) {
            Some(row) => {
                self.position += 1;
                Ok(Some(Arc::clone(row)))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.position = self.rows.len();
        Ok(())
    }
}
