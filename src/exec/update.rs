//! # Update Plannables
//!
//! Mutating plans are not cursors: executing one drives its input cursor
//! to completion, applying the adapter's corresponding mutation to every
//! row, and answers a result summary. Adapter failures propagate with the
//! partial progress recorded in the error context; the failing row is not
//! counted as processed and nothing is retried.

use std::fmt;
use std::sync::Arc;

use eyre::Result;

use crate::exec::adapter::{AdapterRef, StoreAdapter};
use crate::exec::api::OperatorRef;
use crate::exec::cursor::Cursor;
use crate::exec::row::SharedRow;

/// Outcome of a completed update plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub rows_processed: u64,
    pub rows_modified: u64,
}

/// Maps an old row to its replacement.
pub trait UpdateFunction: fmt::Debug + Send + Sync {
    fn update(&self, row: &SharedRow) -> Result<SharedRow>;
}

/// A mutating plan handle.
pub trait UpdatePlannable: Send + Sync {
    fn execute(&self, adapter: &AdapterRef) -> Result<UpdateResult>;
}

pub type PlannableRef = Arc<dyn UpdatePlannable>;

/// Drives `input` to completion, applying `apply` per row. On failure the
/// cursor is closed (close failures suppressed) and the error is annotated
/// with the rows processed so far.
fn drive(
    input: &OperatorRef,
    adapter: &AdapterRef,
    verb: &str,
    mut apply: impl FnMut(&AdapterRef, &SharedRow) -> Result<u64>,
) -> Result<UpdateResult> {
    let mut cursor = input.cursor(adapter);
    let mut rows_processed = 0u64;
    let mut rows_modified = 0u64;
    let outcome = (|| -> Result<()> {
        cursor.open()?;
        while let Some(row) = cursor.next()? {
            rows_modified += apply(adapter, &row)?;
            rows_processed += 1;
        }
        Ok(())
    })();
    match outcome {
        Ok(()) => {
            cursor.close()?;
            Ok(UpdateResult {
                rows_processed,
                rows_modified,
            })
        }
        Err(e) => {
            let _ = cursor.close();
            Err(e.wrap_err(format!(
                "{} failed after {} rows processed",
                verb, rows_processed
            )))
        }
    }
}

#[derive(Debug)]
pub struct InsertPlan {
    input: OperatorRef,
}

impl InsertPlan {
    pub fn new(input: OperatorRef) -> Self {
        Self { input }
    }
}

impl UpdatePlannable for InsertPlan {
    fn execute(&self, adapter: &AdapterRef) -> Result<UpdateResult> {
        drive(&self.input, adapter, "insert", |adapter, row| {
            adapter.write_row(row)?;
            Ok(1)
        })
    }
}

#[derive(Debug)]
pub struct UpdatePlan {
    input: OperatorRef,
    update_function: Arc<dyn UpdateFunction>,
}

impl UpdatePlan {
    pub fn new(input: OperatorRef, update_function: Arc<dyn UpdateFunction>) -> Self {
        Self {
            input,
            update_function,
        }
    }
}

impl UpdatePlannable for UpdatePlan {
    fn execute(&self, adapter: &AdapterRef) -> Result<UpdateResult> {
        let update_function = Arc::clone(&self.update_function);
        drive(&self.input, adapter, "update", move |adapter, row| {
            let replacement = update_function.update(row)?;
            adapter.update_row(row, &replacement)?;
            Ok(1)
        })
    }
}

#[derive(Debug)]
pub struct DeletePlan {
    input: OperatorRef,
}

impl DeletePlan {
    pub fn new(input: OperatorRef) -> Self {
        Self { input }
    }
}

impl UpdatePlannable for DeletePlan {
    fn execute(&self, adapter: &AdapterRef) -> Result<UpdateResult> {
        drive(&self.input, adapter, "delete", |adapter, row| {
            adapter.delete_row(row)?;
            Ok(1)
        })
    }
}
