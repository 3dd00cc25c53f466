//! # Aggregation and Counting
//!
//! [`Aggregate`] consumes input grouped on its leading fields: for each
//! maximal run of rows sharing those fields it feeds one aggregator per
//! configured name and emits a single row of the grouping fields followed
//! by the finalized aggregator outputs. With zero grouping fields, an
//! empty input still yields one row of empty-state outputs.
//!
//! [`Count`] emits one singleton count row per maximal run of consecutive
//! rows of the counted type, at the end of the run; rows of other types
//! pass through and terminate the run.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use eyre::{bail, Result};

use crate::exec::adapter::AdapterRef;
use crate::exec::api::{Operator, OperatorRef};
use crate::exec::cursor::Cursor;
use crate::exec::row::{Row, SharedRow, ValuesRow};
use crate::types::{DerivedKind, RowType, Value};

/// Accumulator for one aggregate over one run of rows.
pub trait Aggregator: Send {
    fn input(&mut self, value: &Value<'static>) -> Result<()>;

    /// Finalizes and resets the accumulator.
    fn output(&mut self) -> Result<Value<'static>>;
}

/// Creates aggregators by name, once per run and aggregate column.
pub trait AggregatorFactory: fmt::Debug + Send + Sync {
    fn create(&self, name: &str) -> Result<Box<dyn Aggregator>>;
}

/// count, sum, min and max over integers and floats. Only non-null values
/// are counted, so the count of an empty or all-null run is zero; the sum
/// of such a run is null.
#[derive(Debug)]
pub struct BasicAggregatorFactory;

impl AggregatorFactory for BasicAggregatorFactory {
    fn create(&self, name: &str) -> Result<Box<dyn Aggregator>> {
        match name {
            "count" => Ok(Box::new(CountAggregator { count: 0 })),
            "sum" => Ok(Box::new(SumAggregator {
                sum_int: None,
                sum_float: None,
            })),
            "min" => Ok(Box::new(ExtremeAggregator {
                best: None,
                want_greater: false,
            })),
            "max" => Ok(Box::new(ExtremeAggregator {
                best: None,
                want_greater: true,
            })),
            other => bail!("unknown aggregator '{}'", other),
        }
    }
}

pub fn basic_aggregators() -> Arc<dyn AggregatorFactory> {
    Arc::new(BasicAggregatorFactory)
}

struct CountAggregator {
    count: i64,
}

impl Aggregator for CountAggregator {
    fn input(&mut self, value: &Value<'static>) -> Result<()> {
        if !value.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn output(&mut self) -> Result<Value<'static>> {
        Ok(Value::Int(std::mem::take(&mut self.count)))
    }
}

struct SumAggregator {
    sum_int: Option<i64>,
    sum_float: Option<f64>,
}

impl Aggregator for SumAggregator {
    fn input(&mut self, value: &Value<'static>) -> Result<()> {
        match value {
            Value::Null => {}
            Value::Int(i) => *self.sum_int.get_or_insert(0) += i,
            Value::Float(f) => *self.sum_float.get_or_insert(0.0) += f,
            other => bail!("cannot sum {:?}", other.conversion_type()),
        }
        Ok(())
    }

    fn output(&mut self) -> Result<Value<'static>> {
        let result = match (self.sum_int.take(), self.sum_float.take()) {
            (None, None) => Value::Null,
            (Some(i), None) => Value::Int(i),
            (None, Some(f)) => Value::Float(f),
            (Some(i), Some(f)) => Value::Float(i as f64 + f),
        };
        Ok(result)
    }
}

struct ExtremeAggregator {
    best: Option<Value<'static>>,
    want_greater: bool,
}

impl Aggregator for ExtremeAggregator {
    fn input(&mut self, value: &Value<'static>) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.best {
            None => true,
            Some(best) => {
                let cmp = value.cmp_total(best);
                if self.want_greater {
                    cmp == std::cmp::Ordering::Greater
                } else {
                    cmp == std::cmp::Ordering::Less
                }
            }
        };
        if replace {
            self.best = Some(value.clone());
        }
        Ok(())
    }

    fn output(&mut self) -> Result<Value<'static>> {
        Ok(self.best.take().unwrap_or(Value::Null))
    }
}

#[derive(Debug)]
pub struct Aggregate {
    input: OperatorRef,
    grouping_fields: usize,
    factory: Arc<dyn AggregatorFactory>,
    aggregator_names: Vec<String>,
    output_row_type: RowType,
}

impl Aggregate {
    pub fn new(
        input: OperatorRef,
        grouping_fields: usize,
        factory: Arc<dyn AggregatorFactory>,
        aggregator_names: Vec<String>,
    ) -> Self {
        let output_row_type = RowType::derived(
            DerivedKind::Aggregate,
            grouping_fields as i32,
            grouping_fields + aggregator_names.len(),
        );
        Self {
            input,
            grouping_fields,
            factory,
            aggregator_names,
            output_row_type,
        }
    }

    pub fn output_row_type(&self) -> &RowType {
        &self.output_row_type
    }
}

impl Operator for Aggregate {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(AggregateCursor {
            input: self.input.cursor(adapter),
            grouping_fields: self.grouping_fields,
            factory: Arc::clone(&self.factory),
            aggregator_names: self.aggregator_names.clone(),
            output_row_type: self.output_row_type.clone(),
            run: None,
            input_done: false,
            emitted_any: false,
        })
    }
}

struct Run {
    key: Vec<Value<'static>>,
    aggregators: Vec<Box<dyn Aggregator>>,
}

struct AggregateCursor {
    input: Box<dyn Cursor>,
    grouping_fields: usize,
    factory: Arc<dyn AggregatorFactory>,
    aggregator_names: Vec<String>,
    output_row_type: RowType,
    run: Option<Run>,
    input_done: bool,
    emitted_any: bool,
}

impl AggregateCursor {
    fn group_key(&self, row: &dyn Row) -> Result<Vec<Value<'static>>> {
        (0..self.grouping_fields).map(|i| row.field(i)).collect()
    }

    fn new_run(&self, key: Vec<Value<'static>>) -> Result<Run> {
        let aggregators = self
            .aggregator_names
            .iter()
            .map(|name| self.factory.create(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Run { key, aggregators })
    }

    fn accumulate(run: &mut Run, grouping_fields: usize, row: &dyn Row) -> Result<()> {
        for (offset, aggregator) in run.aggregators.iter_mut().enumerate() {
            let value = row.field(grouping_fields + offset)?;
            aggregator.input(&value)?;
        }
        Ok(())
    }

    fn finish_run(&mut self, mut run: Run) -> Result<SharedRow> {
        let mut values = run.key;
        for aggregator in &mut run.aggregators {
            values.push(aggregator.output()?);
        }
        self.emitted_any = true;
        Ok(Arc::new(ValuesRow::new(
            self.output_row_type.clone(),
            values,
        )))
    }
}

impl Cursor for AggregateCursor {
    fn open(&mut self) -> Result<()> {
        self.run = None;
        self.input_done = false;
        self.emitted_any = false;
        self.input.open()
    }

    fn next(&mut self) -> Result<Option<SharedRow>> {
        loop {
            if self.input_done {
                if let Some(run) = self.run.take() {
                    return Ok(Some(self.finish_run(run)?));
                }
                // A grand total over nothing still answers: one row of
                // empty-state aggregator outputs.
                if self.grouping_fields == 0 && !self.emitted_any {
                    let run = self.new_run(Vec::new())?;
                    return Ok(Some(self.finish_run(run)?));
                }
                return Ok(None);
            }
            match self.input.next()? {
                None => self.input_done = true,
                Some(row) => {
                    let key = self.group_key(row.as_ref())?;
                    let boundary = match &self.run {
                        Some(run) => run.key != key,
                        None => false,
                    };
                    let mut finished_row = None;
                    if boundary {
                        if let Some(finished) = self.run.take() {
                            finished_row = Some(self.finish_run(finished)?);
                        }
                    }
                    if self.run.is_none() {
                        self.run = Some(self.new_run(key)?);
                    }
                    if let Some(run) = self.run.as_mut() {
                        Self::accumulate(run, self.grouping_fields, row.as_ref())?;
                    }
                    if let Some(out) = finished_row {
                        return Ok(Some(out));
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.run = None;
        self.input_done = true;
        self.input.close()
    }
}

/// Output type of [`Count`] rows: a single count field.
pub fn count_row_type() -> RowType {
    RowType::derived(DerivedKind::Count, 0, 1)
}

#[derive(Debug)]
pub struct Count {
    input: OperatorRef,
    count_type: RowType,
}

impl Count {
    pub fn new(input: OperatorRef, count_type: RowType) -> Self {
        Self { input, count_type }
    }
}

impl Operator for Count {
    fn cursor(&self, adapter: &AdapterRef) -> Box<dyn Cursor> {
        Box::new(CountCursor {
            input: self.input.cursor(adapter),
            count_type: self.count_type.clone(),
            output_row_type: count_row_type(),
            run: None,
            pending: VecDeque::new(),
            input_done: false,
        })
    }
}

struct CountCursor {
    input: Box<dyn Cursor>,
    count_type: RowType,
    output_row_type: RowType,
    run: Option<i64>,
    pending: VecDeque<SharedRow>,
    input_done: bool,
}

impl CountCursor {
    fn flush_run(&mut self) {
        if let Some(count) = self.run.take() {
            self.pending.push_back(Arc::new(ValuesRow::new(
                self.output_row_type.clone(),
                vec![Value::Int(count)],
            )));
        }
    }
}

impl Cursor for CountCursor {
    fn open(&mut self) -> Result<()> {
        self.run = None;
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
                None => {
                    self.input_done = true;
                    self.flush_run();
                }
                Some(row) => {
                    if *row.row_type() == self.count_type {
                        self.run = Some(self.run.unwrap_or(0) + 1);
                    } else {
                        self.flush_run();
                        self.pending.push_back(row);
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.run = None;
        self.pending.clear();
        self.input_done = true;
        self.input.close()
    }
}
