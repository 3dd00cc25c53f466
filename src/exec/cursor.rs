//! # Cursor Protocol
//!
//! Every operator's execution state is a [`Cursor`]: `open` prepares it,
//! `next` pulls one row, `close` releases resources. Cursors are
//! single-threaded cooperative; a cursor tree belongs to one execution and
//! only one method is ever in flight on it. `next` after exhaustion keeps
//! answering `None`, and operator-level `close` is idempotent.
//!
//! [`Bindings`] is the positional side channel between outer and inner
//! cursors of nested operators: the outer writes a row or hkey at its
//! declared position, then re-opens the inner, which reads the slot at
//! open time. The array is shared across one cursor tree and cleared when
//! the root closes.
//!
//! [`TopLevelCursor`] is the execution entry point's guard: it rejects use
//! after close, closes the whole tree when an error escapes `next`
//! (suppressing secondary close failures so the original error survives),
//! and ends the binding lifecycle.

use std::sync::Arc;

use eyre::Result;
use parking_lot::Mutex;

use crate::error::Error;
use crate::exec::row::SharedRow;
use crate::hkey::HKey;

pub trait Cursor: Send {
    fn open(&mut self) -> Result<()>;

    fn next(&mut self) -> Result<Option<SharedRow>>;

    fn close(&mut self) -> Result<()>;
}

/// A value an outer cursor passes to an inner one.
#[derive(Debug, Clone)]
pub enum BindingValue {
    Row(SharedRow),
    HKey(HKey),
}

/// Sparse positional array of binding values.
#[derive(Debug, Default)]
pub struct Bindings {
    slots: Vec<Option<BindingValue>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_row(&mut self, position: usize, row: SharedRow) {
        self.set(position, BindingValue::Row(row));
    }

    pub fn set_hkey(&mut self, position: usize, hkey: HKey) {
        self.set(position, BindingValue::HKey(hkey));
    }

    fn set(&mut self, position: usize, value: BindingValue) {
        if position >= self.slots.len() {
            self.slots.resize_with(position + 1, || None);
        }
        self.slots[position] = Some(value);
    }

    pub fn get(&self, position: usize) -> Result<&BindingValue> {
        self.slots
            .get(position)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::BindingMissing(position).into())
    }

    /// The bound row at `position`.
    pub fn row_at(&self, position: usize) -> Result<SharedRow> {
        match self.get(position)? {
            BindingValue::Row(row) => Ok(Arc::clone(row)),
            BindingValue::HKey(_) => {
                eyre::bail!("binding position {} holds an hkey, not a row", position)
            }
        }
    }

    /// The hkey at `position`, taken from the bound row when a row is
    /// bound there.
    pub fn hkey_at(&self, position: usize) -> Result<HKey> {
        match self.get(position)? {
            BindingValue::HKey(hkey) => Ok(hkey.clone()),
            BindingValue::Row(row) => row
                .hkey()
                .cloned()
                .ok_or_else(|| eyre::eyre!("row bound at position {} carries no hkey", position)),
        }
    }

    pub fn unset(&mut self, position: usize) {
        if let Some(slot) = self.slots.get_mut(position) {
            *slot = None;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

pub type BindingsRef = Arc<Mutex<Bindings>>;

pub fn new_bindings() -> BindingsRef {
    Arc::new(Mutex::new(Bindings::new()))
}

/// Guard around the root operator's cursor.
pub struct TopLevelCursor {
    inner: Box<dyn Cursor>,
    bindings: BindingsRef,
    closed: bool,
}

impl TopLevelCursor {
    pub fn new(inner: Box<dyn Cursor>, bindings: BindingsRef) -> Self {
        Self {
            inner,
            bindings,
            closed: false,
        }
    }

    fn shutdown(&mut self) {
        // Secondary close failures must not mask the error being raised.
        let _ = self.inner.close();
        self.bindings.lock().clear();
        self.closed = true;
    }
}

impl Cursor for TopLevelCursor {
    fn open(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::CursorClosed.into());
        }
        match self.inner.open() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        if self.closed {
            return Err(Error::CursorClosed.into());
        }
        match self.inner.next() {
            Ok(row) => Ok(row),
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.inner.close();
        self.bindings.lock().clear();
        self.closed = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_kind;

    #[test]
    fn missing_binding_is_reported_by_position() {
        let bindings = Bindings::new();
        let err = bindings.get(3).unwrap_err();
        assert!(is_kind(&err, &Error::BindingMissing(0)));
    }

    #[test]
    fn hkey_binding_round_trips() {
        use crate::hkey::KeySegment;
        let mut bindings = Bindings::new();
        let hkey = HKey::from_segments([KeySegment::Ordinal(1), KeySegment::Int(5)]);
        bindings.set_hkey(2, hkey.clone());
        assert_eq!(bindings.hkey_at(2).unwrap(), hkey);
        bindings.unset(2);
        assert!(bindings.get(2).is_err());
    }
}
