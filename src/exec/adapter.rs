//! # Store Adapter Contract
//!
//! The operator tree never touches storage directly; it goes through a
//! [`StoreAdapter`]. The adapter serves hkey-ordered group scans, index
//! scans, exact and branch lookups, row mutations, and owns the bindings
//! array for one execution. All methods are synchronous; storage failures
//! surface as adapter errors.
//!
//! Streams returned by the adapter release their resources on drop.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use eyre::Result;

use crate::exec::cursor::BindingsRef;
use crate::exec::row::SharedRow;
use crate::hkey::HKey;
use crate::types::{RowType, Value};

/// Pull stream of rows produced by the store.
pub type RowStream = Box<dyn Iterator<Item = Result<SharedRow>> + Send>;

/// Handle of a group: a set of parent/child tables stored co-located and
/// iterated in hkey order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupHandle {
    pub group_id: i32,
    pub name: Arc<str>,
}

impl GroupHandle {
    pub fn new(group_id: i32, name: impl AsRef<str>) -> Self {
        Self {
            group_id,
            name: Arc::from(name.as_ref()),
        }
    }
}

/// Half-open `[lo, hi)` range over index key values, compared
/// lexicographically. An absent bound is unbounded on that side.
#[derive(Debug, Clone, Default)]
pub struct IndexKeyRange {
    pub lo: Option<Vec<Value<'static>>>,
    pub hi: Option<Vec<Value<'static>>>,
}

impl IndexKeyRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(lo: Option<Vec<Value<'static>>>, hi: Option<Vec<Value<'static>>>) -> Self {
        Self { lo, hi }
    }

    fn compare(key: &[Value<'static>], bound: &[Value<'static>]) -> CmpOrdering {
        for (index, b) in bound.iter().enumerate() {
            let k = key.get(index).unwrap_or(&Value::Null);
            match k.cmp_total(b) {
                CmpOrdering::Equal => continue,
                other => return other,
            }
        }
        CmpOrdering::Equal
    }

    pub fn contains(&self, key: &[Value<'static>]) -> bool {
        if let Some(lo) = &self.lo {
            if Self::compare(key, lo) == CmpOrdering::Less {
                return false;
            }
        }
        if let Some(hi) = &self.hi {
            if Self::compare(key, hi) != CmpOrdering::Less {
                return false;
            }
        }
        true
    }
}

pub trait StoreAdapter: Send + Sync {
    /// Rows of a group in hkey order. With an hkey, the scan is positional:
    /// `deep` selects the whole subtree under the hkey, otherwise only its
    /// immediate children.
    fn group_cursor(
        &self,
        group: &GroupHandle,
        hkey: Option<&HKey>,
        deep: bool,
    ) -> Result<RowStream>;

    /// Index entries in index order, optionally reversed, restricted to a
    /// half-open key range. `inner_join_until` is scan bookkeeping handed
    /// through unchanged: the deepest ancestor table at which index rows
    /// are considered joined.
    fn index_cursor(
        &self,
        index_type: &RowType,
        range: &IndexKeyRange,
        reverse: bool,
        inner_join_until: Option<&RowType>,
    ) -> Result<RowStream>;

    /// The row stored at exactly `hkey`, if any.
    fn ancestor_row(&self, group: &GroupHandle, hkey: &HKey) -> Result<Option<SharedRow>>;

    /// The subtree rooted at `hkey`, in hkey order.
    fn branch_cursor(&self, group: &GroupHandle, hkey: &HKey) -> Result<RowStream>;

    fn write_row(&self, row: &SharedRow) -> Result<()>;

    fn update_row(&self, old: &SharedRow, new: &SharedRow) -> Result<()>;

    fn delete_row(&self, row: &SharedRow) -> Result<()>;

    /// The bindings array shared by this execution's cursor tree.
    fn bindings(&self) -> BindingsRef;
}

pub type AdapterRef = Arc<dyn StoreAdapter>;
