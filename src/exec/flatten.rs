//! # Flatten
//!
//! Streaming join of an hkey-ordered parent/child sequence. The input
//! interleaves parent rows with their descendants; flatten pairs each
//! child with the parent currently in scope and emits the pair as one
//! flattened row. Because input arrives in hkey order, one parent of
//! state is enough: a row outside the current parent's subtree retires
//! the parent.
//!
//! Join variants: inner emits only parent/child pairs; left also emits a
//! single childless-parent row with null child fields; right emits
//! orphaned children with null parent fields; full is both. KEEP_PARENT /
//! KEEP_CHILD additionally pass the original rows through. Output is in
//! hkey order; descending input hkeys are reported as an ordering
//! violation.

use std::collections::VecDeque;

use eyre::Result;

use crate::error::Error;
use crate::exec::api::{FlattenOption, Operator, OperatorRef};
use crate::exec::adapter::AdapterRef;
use crate::exec::cursor::Cursor;
use crate::exec::row::{FlattenedRow, SharedRow};
use crate::hkey::{HKey, KeySegment};
use crate::types::{JoinType, RowType};

#[derive(Debug)]
pub struct Flatten {
    input: OperatorRef,
    parent_type: RowType,
    child_type: RowType,
    join: JoinType,
    keep_parent: bool,
    keep_child: bool,
    left_join_shortens_hkey: bool,
}

impl Flatten {
    pub fn new(
        input: OperatorRef,
        parent_type: RowType,
        child_type: RowType,
        join: JoinType,
        flags: &[FlattenOption],
    ) -> Self {
        Self {
            input,
            parent_type,
            child_type,
            join,
            keep_parent: flags.contains(&FlattenOption::KeepParent),
            keep_child: flags.contains(&FlattenOption::KeepChild),
            left_join_shortens_hkey: flags.contains(&FlattenOption::LeftJoinShortensHKey),
        }
    }
}

impl Operator for Flatten {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        let flattened_type = RowType::flattened(
            self.parent_type.clone(),
            self.child_type.clone(),
            self.join,
        );
        Box::new(FlattenCursor {
            input: self.input.cursor(adapter),
            parent_type: self.parent_type.clone(),
            child_type: self.child_type.clone(),
            flattened_type,
            join: self.join,
            keep_parent: self.keep_parent,
            keep_child: self.keep_child,
            left_join_shortens_hkey: self.left_join_shortens_hkey,
            parent: None,
            childless: false,
            pending: VecDeque::new(),
            previous_hkey: None,
            input_done: false,
        })
    }
}

struct FlattenCursor {
    input: Box<dyn Cursor>,
    parent_type: RowType,
    child_type: RowType,
    flattened_type: RowType,
    join: JoinType,
    keep_parent: bool,
    keep_child: bool,
    left_join_shortens_hkey: bool,
    parent: Option<SharedRow>,
    childless: bool,
    pending: VecDeque<SharedRow>,
    previous_hkey: Option<HKey>,
    input_done: bool,
}

impl FlattenCursor {
    fn left_joins(&self) -> bool {
        matches!(self.join, JoinType::Left | JoinType::Full)
    }

    fn right_joins(&self) -> bool {
        matches!(self.join, JoinType::Right | JoinType::Full)
    }

    fn flattened(&self, parent: Option<SharedRow>, child: Option<SharedRow>, hkey: HKey) -> SharedRow {
        std::sync::Arc::new(FlattenedRow::new(
            self.flattened_type.clone(),
            parent,
            child,
            hkey,
            self.parent_type.n_fields(),
        ))
    }

    /// Retires the current parent, emitting its left-join row if it never
    /// saw a child.
    fn leave_parent(&mut self) -> Result<()> {
        if let Some(parent) = self.parent.take() {
            if self.childless && self.left_joins() {
                let parent_hkey = parent
                    .hkey()
                    .ok_or_else(|| eyre::eyre!("flatten parent row has no hkey"))?;
                let hkey = if self.left_join_shortens_hkey {
                    parent_hkey.clone()
                } else {
                    // Null child key under the child's ordinal keeps the
                    // row ordered right after its parent.
                    let mut hkey = parent_hkey.clone();
                    if let Some(ordinal) = self.child_type.leaf_ordinal() {
                        hkey.push(KeySegment::Ordinal(ordinal));
                    }
                    hkey.push(KeySegment::Null);
                    hkey
                };
                let row = self.flattened(Some(parent), None, hkey);
                self.pending.push_back(row);
            }
        }
        self.childless = false;
        Ok(())
    }

    fn check_ordering(&mut self, row: &SharedRow) -> Result<()> {
        if let Some(hkey) = row.hkey() {
            if let Some(previous) = &self.previous_hkey {
                if hkey < previous {
                    return Err(Error::OrderingViolation(format!(
                        "row {:?} arrived after {:?}",
                        hkey, previous
                    ))
                    .into());
                }
            }
            self.previous_hkey = Some(hkey.clone());
        }
        Ok(())
    }

    fn absorb(&mut self, row: SharedRow) -> Result<()> {
        self.check_ordering(&row)?;
        let left_parent_subtree = match (&self.parent, row.hkey()) {
            (Some(parent), Some(hkey)) => {
                let parent_hkey = parent
                    .hkey()
                    .ok_or_else(|| eyre::eyre!("flatten parent row has no hkey"))?;
                !parent_hkey.is_prefix_of(hkey)
            }
            _ => false,
        };
        if left_parent_subtree {
            self.leave_parent()?;
        }
        if *row.row_type() == self.parent_type {
            self.leave_parent()?;
            if self.keep_parent {
                self.pending.push_back(row.clone());
            }
            self.parent = Some(row);
            self.childless = true;
        } else if *row.row_type() == self.child_type {
            let child_hkey = row
                .hkey()
                .cloned()
                .ok_or_else(|| eyre::eyre!("flatten child row has no hkey"))?;
            if self.keep_child {
                self.pending.push_back(row.clone());
            }
            match &self.parent {
                Some(parent) => {
                    self.childless = false;
                    let flattened =
                        self.flattened(Some(parent.clone()), Some(row), child_hkey);
                    self.pending.push_back(flattened);
                }
                None => {
                    if self.right_joins() {
                        let flattened = self.flattened(None, Some(row), child_hkey);
                        self.pending.push_back(flattened);
                    }
                }
            }
        } else {
            self.pending.push_back(row);
        }
        Ok(())
    }
}

impl Cursor for FlattenCursor {
    fn open(&mut self) -> Result<()> {
        self.parent = None;
        self.childless = false;
        self.pending.clear();
        self.previous_hkey = None;
        self.input_done = false;
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.input_done {
                return Ok(None);
            }
            match self.input.next()? {
                None => {
                    self.input_done = true;
                    self.leave_parent()?;
                }
                Some(row) => self.absorb(row)?,
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.parent = None;
        self.pending.clear();
        self.input_done = true;
        self.input.close()
    }
}
