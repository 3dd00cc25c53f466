//! # Lookup Operators
//!
//! Hkey-driven navigation within a group:
//!
//! - [`AncestorLookup`] emits, for each input row of the declared type, the
//!   stored rows at the requested ancestor types, root to leaf.
//! - [`BranchLookup`] emits the whole subtree rooted at the input row's
//!   hkey.
//!
//! Both have nested variants that take their key from a binding position
//! instead of piped input, for use under the inner side of nested-loop
//! operators. The binding is read at open time, so every re-open under a
//! new outer row looks up afresh.

use std::collections::VecDeque;
use std::sync::Arc;

use eyre::Result;

use crate::exec::adapter::{AdapterRef, GroupHandle, RowStream, StoreAdapter};
use crate::exec::api::{LimitRef, LookupOption, Operator, OperatorRef};
use crate::exec::cursor::Cursor;
use crate::exec::row::SharedRow;
use crate::hkey::HKey;
use crate::types::RowType;

/// Ancestor hkeys for a row: its hkey truncated to each ancestor type's
/// segment count, root to leaf.
fn ancestor_hkeys(hkey: &HKey, ancestor_types: &[RowType]) -> Vec<HKey> {
    let mut depths: Vec<usize> = ancestor_types
        .iter()
        .filter_map(RowType::hkey_segment_count)
        .collect();
    depths.sort_unstable();
    depths.into_iter().map(|n| hkey.prefix(n)).collect()
}

#[derive(Debug)]
pub struct AncestorLookup {
    input: OperatorRef,
    group: GroupHandle,
    row_type: RowType,
    ancestor_types: Vec<RowType>,
    flag: LookupOption,
}

impl AncestorLookup {
    pub fn new(
        input: OperatorRef,
        group: GroupHandle,
        row_type: RowType,
        ancestor_types: Vec<RowType>,
        flag: LookupOption,
    ) -> Self {
        Self {
            input,
            group,
            row_type,
            ancestor_types,
            flag,
        }
    }
}

impl Operator for AncestorLookup {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(AncestorLookupCursor {
            adapter: Arc::clone(adapter),
            input: self.input.cursor(adapter),
            group: self.group.clone(),
            row_type: self.row_type.clone(),
            ancestor_types: self.ancestor_types.clone(),
            keep_input: self.flag == LookupOption::KeepInput,
            pending: VecDeque::new(),
            input_done: false,
        })
    }
}

struct AncestorLookupCursor {
    adapter: AdapterRef,
    input: Box<dyn Cursor>,
    group: GroupHandle,
    row_type: RowType,
    ancestor_types: Vec<RowType>,
    keep_input: bool,
    pending: VecDeque<SharedRow>,
    input_done: bool,
}

impl AncestorLookupCursor {
    fn find_ancestors(&mut self, row: &SharedRow) -> Result<()> {
        let hkey = row
            .hkey()
            .ok_or_else(|| eyre::eyre!("ancestor lookup over a row with no hkey"))?;
        for ancestor in ancestor_hkeys(hkey, &self.ancestor_types) {
            if let Some(found) = self.adapter.ancestor_row(&self.group, &ancestor)? {
                self.pending.push_back(found);
            }
        }
        Ok(())
    }
}

impl Cursor for AncestorLookupCursor {
    fn open(&mut self) -> Result<()> {
        self.pending.clear();
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
                None => self.input_done = true,
                Some(row) => {
                    if *row.row_type() == self.row_type {
                        self.find_ancestors(&row)?;
                    }
                    if self.keep_input {
                        self.pending.push_back(row);
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        self.input_done = true;
        self.input.close()
    }
}

#[derive(Debug)]
pub struct AncestorLookupNested {
    group: GroupHandle,
    #[allow(dead_code)]
    row_type: RowType,
    ancestor_types: Vec<RowType>,
    hkey_binding_position: usize,
}

impl AncestorLookupNested {
    pub fn new(
        group: GroupHandle,
        row_type: RowType,
        ancestor_types: Vec<RowType>,
        hkey_binding_position: usize,
    ) -> Self {
        Self {
            group,
            row_type,
            ancestor_types,
            hkey_binding_position,
        }
    }
}

impl Operator for AncestorLookupNested {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(AncestorLookupNestedCursor {
            adapter: Arc::clone(adapter),
            group: self.group.clone(),
            ancestor_types: self.ancestor_types.clone(),
            hkey_binding_position: self.hkey_binding_position,
            pending: VecDeque::new(),
        })
    }
}

struct AncestorLookupNestedCursor {
    adapter: AdapterRef,
    group: GroupHandle,
    ancestor_types: Vec<RowType>,
    hkey_binding_position: usize,
    pending: VecDeque<SharedRow>,
}

impl Cursor for AncestorLookupNestedCursor {
    fn open(&mut self) -> Result<()> {
        self.pending.clear();
        let hkey = self
            .adapter
            .bindings()
            .lock()
            .hkey_at(self.hkey_binding_position)?;
        for ancestor in ancestor_hkeys(&hkey, &self.ancestor_types) {
            if let Some(found) = self.adapter.ancestor_row(&self.group, &ancestor)? {
                self.pending.push_back(found);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }
}

/// Root hkey of the branch to fetch for a row: the row's hkey, truncated
/// to the output type's level when that level is shallower.
fn branch_root(hkey: &HKey, output_row_type: &RowType) -> HKey {
    match output_row_type.hkey_segment_count() {
        Some(segments) if segments < hkey.segment_count() => hkey.prefix(segments),
        _ => hkey.clone(),
    }
}

#[derive(Debug)]
pub struct BranchLookup {
    input: OperatorRef,
    group: GroupHandle,
    input_row_type: RowType,
    output_row_type: RowType,
    flag: LookupOption,
    limit: LimitRef,
}

impl BranchLookup {
    pub fn new(
        input: OperatorRef,
        group: GroupHandle,
        input_row_type: RowType,
        output_row_type: RowType,
        flag: LookupOption,
        limit: LimitRef,
    ) -> Self {
        Self {
            input,
            group,
            input_row_type,
            output_row_type,
            flag,
            limit,
        }
    }
}

impl Operator for BranchLookup {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(BranchLookupCursor {
            adapter: Arc::clone(adapter),
            input: self.input.cursor(adapter),
            group: self.group.clone(),
            input_row_type: self.input_row_type.clone(),
            output_row_type: self.output_row_type.clone(),
            keep_input: self.flag == LookupOption::KeepInput,
            limit: Arc::clone(&self.limit),
            branch: None,
            input_done: false,
        })
    }
}

struct BranchLookupCursor {
    adapter: AdapterRef,
    input: Box<dyn Cursor>,
    group: GroupHandle,
    input_row_type: RowType,
    output_row_type: RowType,
    keep_input: bool,
    limit: LimitRef,
    branch: Option<RowStream>,
    input_done: bool,
}

impl Cursor for BranchLookupCursor {
    fn open(&mut self) -> Result<()> {
        self.branch = None;
        self.input_done = false;
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            if let Some(branch) = self.branch.as_mut() {
                match branch.next() {
                    Some(row) => {
                        let row = row?;
                        if self.limit.limit_reached(row.as_ref()) {
                            self.branch = None;
                            continue;
                        }
                        return Ok(Some(row));
                    }
                    None => self.branch = None,
                }
            }
            if self.input_done {
                return Ok(None);
            }
            match self.input.next()? {
                None => self.input_done = true,
                Some(row) => {
                    if *row.row_type() == self.input_row_type {
                        let hkey = row
                            .hkey()
                            .ok_or_else(|| eyre::eyre!("branch lookup over a row with no hkey"))?;
                        let root = branch_root(hkey, &self.output_row_type);
                        let branch = self.adapter.branch_cursor(&self.group, &root)?;
                        if self.keep_input {
                            self.branch = Some(branch);
                            return Ok(Some(row));
                        }
                        self.branch = Some(branch);
                    } else if self.keep_input {
                        return Ok(Some(row));
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.branch = None;
        self.input_done = true;
        self.input.close()
    }
}

#[derive(Debug)]
pub struct BranchLookupNested {
    group: GroupHandle,
    #[allow(dead_code)]
    input_row_type: RowType,
    output_row_type: RowType,
    #[allow(dead_code)]
    flag: LookupOption,
    binding_position: usize,
}

impl BranchLookupNested {
    pub fn new(
        group: GroupHandle,
        input_row_type: RowType,
        output_row_type: RowType,
        flag: LookupOption,
        binding_position: usize,
    ) -> Self {
        Self {
            group,
            input_row_type,
            output_row_type,
            flag,
            binding_position,
        }
    }
}

impl Operator for BranchLookupNested {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(BranchLookupNestedCursor {
            adapter: Arc::clone(adapter),
            group: self.group.clone(),
            output_row_type: self.output_row_type.clone(),
            binding_position: self.binding_position,
            branch: None,
        })
    }
}

struct BranchLookupNestedCursor {
    adapter: AdapterRef,
    group: GroupHandle,
    output_row_type: RowType,
    binding_position: usize,
    branch: Option<RowStream>,
}

impl Cursor for BranchLookupNestedCursor {
    fn open(&mut self) -> Result<()> {
        let hkey = self
            .adapter
            .bindings()
            .lock()
            .hkey_at(self.binding_position)?;
        let root = branch_root(&hkey, &self.output_row_type);
        self.branch = Some(self.adapter.branch_cursor(&self.group, &root)?);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        match self.branch.as_mut().and_then(Iterator::next) {
            Some(row) => Ok(Some(row?)),
            None => {
                self.branch = None;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.branch = None;
        Ok(())
    }
}
