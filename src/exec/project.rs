//! # Projection
//!
//! Rewrites rows of the declared input type into rows of the output type
//! whose fields are an expression vector evaluated against the input row.
//! Rows of any other type pass through unchanged, so a projection can sit
//! inside a multi-type hkey-ordered stream.

use std::sync::Arc;

use eyre::Result;

use crate::exec::adapter::AdapterRef;
use crate::exec::api::{Operator, OperatorRef};
use crate::exec::cursor::Cursor;
use crate::exec::expression::ExpressionRef;
use crate::exec::row::{SharedRow, ValuesRow};
use crate::types::RowType;

#[derive(Debug)]
pub struct Project {
    input: OperatorRef,
    input_row_type: RowType,
    output_row_type: RowType,
    expressions: Vec<ExpressionRef>,
}

impl Project {
    pub fn new(
        input: OperatorRef,
        input_row_type: RowType,
        output_row_type: RowType,
        expressions: Vec<ExpressionRef>,
    ) -> Self {
        Self {
            input,
            input_row_type,
            output_row_type,
            expressions,
        }
    }
}

impl Operator for Project {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(ProjectCursor {
            input: self.input.cursor(adapter),
            input_row_type: self.input_row_type.clone(),
            output_row_type: self.output_row_type.clone(),
            expressions: self.expressions.clone(),
        })
    }
}

struct ProjectCursor {
    input: Box<dyn Cursor>,
    input_row_type: RowType,
    output_row_type: RowType,
    expressions: Vec<ExpressionRef>,
}

impl Cursor for ProjectCursor {
    fn open(&mut self) -> Result<()> {
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        match self.input.next()? {
            None => Ok(None),
            Some(row) => {
                if *row.row_type() != self.input_row_type {
                    return Ok(Some(row));
                }
                let values = self
                    .expressions
                    .iter()
                    .map(|e| e.eval(row.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Arc::new(ValuesRow::with_hkey(
                    self.output_row_type.clone(),
                    values,
                    row.hkey().cloned(),
                ))))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}
