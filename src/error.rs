//! # Error Kinds
//!
//! The distinguishable failure classes of the engine. The ambient result
//! type everywhere is `eyre::Result`; these variants are raised into
//! `eyre::Report` so call sites can classify a failure with
//! `report.downcast_ref::<Error>()` without giving up report context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A row failed envelope or layout validation during parse.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// A scalar value could not be encoded into its field, or a
    /// variable-size value exceeded the field's maximum storage.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Buffer growth was requested for a row embedded in a larger shared
    /// buffer.
    #[error("cannot grow a buffer embedded in a shared region")]
    BufferImmutable,

    /// A cursor method was called after `close`.
    #[error("cursor used after close")]
    CursorClosed,

    /// A nested operator consumed a binding position that was never set.
    #[error("binding position {0} is not set")]
    BindingMissing(usize),

    /// An hkey-ordered operator observed out-of-order input.
    #[error("hkey-ordered input out of order: {0}")]
    OrderingViolation(String),

    /// A storage-layer failure surfaced through the adapter.
    #[error("store adapter failure: {0}")]
    Adapter(String),
}

impl Error {
    pub fn corrupt(msg: impl Into<String>) -> eyre::Report {
        Error::CorruptRow(msg.into()).into()
    }

    pub fn encoding(msg: impl Into<String>) -> eyre::Report {
        Error::Encoding(msg.into()).into()
    }

    pub fn adapter(msg: impl Into<String>) -> eyre::Report {
        Error::Adapter(msg.into()).into()
    }
}

/// True when the report's root failure is the given kind, matching on
/// discriminant only.
pub fn is_kind(report: &eyre::Report, kind: &Error) -> bool {
    report
        .downcast_ref::<Error>()
        .map(|e| std::mem::discriminant(e) == std::mem::discriminant(kind))
        .unwrap_or(false)
}
