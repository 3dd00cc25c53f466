//! # In-Memory Store
//!
//! [`MemStore`] realizes the store adapter contract over ordered in-memory
//! maps: one `BTreeMap<HKey, SharedRow>` per group, so iteration order is
//! hkey order by construction, and one ordered map per index. It backs
//! plan execution in tests and serves as the reference behavior for
//! adapters over real storage.
//!
//! Rows are placed by the hkey they carry; table rows find their group
//! through their table type. Index maintenance is explicit: mutations
//! touch group tables only, and index entries are registered by the
//! caller.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::Arc;

use eyre::Result;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::Error;
use crate::exec::adapter::{GroupHandle, IndexKeyRange, RowStream, StoreAdapter};
use crate::exec::cursor::{new_bindings, BindingsRef};
use crate::exec::row::SharedRow;
use crate::hkey::HKey;
use crate::types::{RowType, Value};

/// Index map key: the entry's key values, disambiguated by the indexed
/// row's hkey so duplicate key values coexist.
#[derive(Debug, Clone)]
struct IndexKey {
    values: Vec<Value<'static>>,
    hkey: HKey,
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        let shared = self.values.len().min(other.values.len());
        for index in 0..shared {
            match self.values[index].cmp_total(&other.values[index]) {
                CmpOrdering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.values
            .len()
            .cmp(&other.values.len())
            .then_with(|| self.hkey.cmp(&other.hkey))
    }
}

#[derive(Default)]
pub struct MemStore {
    groups: RwLock<HashMap<i32, BTreeMap<HKey, SharedRow>>>,
    indexes: RwLock<HashMap<i32, BTreeMap<IndexKey, SharedRow>>>,
    bindings: BindingsRef,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
            bindings: new_bindings(),
        }
    }

    fn group_and_hkey(row: &SharedRow) -> Result<(i32, HKey)> {
        let table = row
            .row_type()
            .as_table()
            .ok_or_else(|| Error::adapter(format!("cannot store row of type {}", row.row_type())))?;
        let hkey = row
            .hkey()
            .cloned()
            .ok_or_else(|| Error::adapter("cannot store a row without an hkey"))?;
        Ok((table.group_id, hkey))
    }

    /// Registers an index entry for `row`, keyed by its leading
    /// `key_fields` fields.
    pub fn add_index_entry(&self, row: SharedRow) -> Result<()> {
        let index = row
            .row_type()
            .as_index()
            .ok_or_else(|| {
                Error::adapter(format!("cannot index a row of type {}", row.row_type()))
            })?
            .clone();
        let hkey = row
            .hkey()
            .cloned()
            .ok_or_else(|| Error::adapter("cannot index a row without an hkey"))?;
        let values = (0..index.key_fields)
            .map(|i| row.field(i))
            .collect::<Result<Vec<_>>>()?;
        self.indexes
            .write()
            .entry(index.index_id)
            .or_default()
            .insert(IndexKey { values, hkey }, row);
        Ok(())
    }

    fn subtree(table: &BTreeMap<HKey, SharedRow>, root: &HKey) -> Vec<SharedRow> {
        table
            .range(root.clone()..)
            .take_while(|(hkey, _)| root.is_prefix_of(hkey))
            .map(|(_, row)| Arc::clone(row))
            .collect()
    }

    fn table_depth(row: &SharedRow) -> Option<usize> {
        row.row_type().as_table().map(|t| t.depth)
    }
}

impl StoreAdapter for MemStore {
    fn group_cursor(
        &self,
        group: &GroupHandle,
        hkey: Option<&HKey>,
        deep: bool,
    ) -> Result<RowStream> {
        let groups = self.groups.read();
        let table = groups.get(&group.group_id);
        let rows: Vec<SharedRow> = match (table, hkey) {
            (None, _) => Vec::new(),
            (Some(table), None) => table.values().map(Arc::clone).collect(),
            (Some(table), Some(root)) => {
                let subtree = Self::subtree(table, root);
                if deep {
                    subtree
                } else {
                    // Immediate children: one level below the subtree root.
                    let root_depth = table
                        .get(root)
                        .and_then(Self::table_depth)
                        .or_else(|| {
                            subtree.iter().filter_map(Self::table_depth).min().map(
                                |d| d.saturating_sub(1),
                            )
                        });
                    match root_depth {
                        None => Vec::new(),
                        Some(depth) => subtree
                            .into_iter()
                            .filter(|row| Self::table_depth(row) == Some(depth + 1))
                            .collect(),
                    }
                }
            }
        };
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn index_cursor(
        &self,
        index_type: &RowType,
        range: &IndexKeyRange,
        reverse: bool,
        _inner_join_until: Option<&RowType>,
    ) -> Result<RowStream> {
        let index = index_type
            .as_index()
            .ok_or_else(|| Error::adapter(format!("not an index type: {}", index_type)))?;
        let indexes = self.indexes.read();
        let mut rows: Vec<SharedRow> = indexes
            .get(&index.index_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(key, _)| range.contains(&key.values))
                    .map(|(_, row)| Arc::clone(row))
                    .collect()
            })
            .unwrap_or_default();
        if reverse {
            rows.reverse();
        }
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn ancestor_row(&self, group: &GroupHandle, hkey: &HKey) -> Result<Option<SharedRow>> {
        Ok(self
            .groups
            .read()
            .get(&group.group_id)
            .and_then(|table| table.get(hkey))
            .map(Arc::clone))
    }

    fn branch_cursor(&self, group: &GroupHandle, hkey: &HKey) -> Result<RowStream> {
        let rows = self
            .groups
            .read()
            .get(&group.group_id)
            .map(|table| Self::subtree(table, hkey))
            .unwrap_or_default();
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn write_row(&self, row: &SharedRow) -> Result<()> {
        let (group_id, hkey) = Self::group_and_hkey(row)?;
        self.groups
            .write()
            .entry(group_id)
            .or_default()
            .insert(hkey, Arc::clone(row));
        Ok(())
    }

    fn update_row(&self, old: &SharedRow, new: &SharedRow) -> Result<()> {
        let (old_group, old_hkey) = Self::group_and_hkey(old)?;
        let (new_group, new_hkey) = Self::group_and_hkey(new)?;
        let mut groups = self.groups.write();
        let table = groups
            .get_mut(&old_group)
            .ok_or_else(|| Error::adapter(format!("no such group {}", old_group)))?;
        if table.remove(&old_hkey).is_none() {
            return Err(Error::adapter(format!(
                "updated row not found at {:?}",
                old_hkey
            )));
        }
        if new_group == old_group {
            table.insert(new_hkey, Arc::clone(new));
        } else {
            groups
                .entry(new_group)
                .or_default()
                .insert(new_hkey, Arc::clone(new));
        }
        Ok(())
    }

    fn delete_row(&self, row: &SharedRow) -> Result<()> {
        let (group_id, hkey) = Self::group_and_hkey(row)?;
        let removed = self
            .groups
            .write()
            .get_mut(&group_id)
            .and_then(|table| table.remove(&hkey));
        if removed.is_none() {
            return Err(Error::adapter(format!("deleted row not found at {:?}", hkey)));
        }
        Ok(())
    }

    fn bindings(&self) -> BindingsRef {
        Arc::clone(&self.bindings)
    }
}
