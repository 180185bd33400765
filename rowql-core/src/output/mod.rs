//! Output handling.
//!
//! The engine hands every projected row to an [`OutputHandler`], which
//! decides when it reaches the [`RowWriter`]: immediately, once per distinct
//! tuple, once per group or after a sort. OFFSET and LIMIT are applied on
//! the way out by a shared [`LimitedSink`].

mod sort;
mod writer;

pub use writer::{MemoryWriter, QueryOutput, RowWriter};

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::RowqlResult;
use crate::executor::tuple_key;
use crate::query::{OrderKey, ParsedQuery};
use sort::sort_records;

/// A projected row with its ORDER BY values and group key.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub values: Vec<Value>,
    pub sort_keys: Vec<Value>,
    pub group_key: String,
}

pub trait OutputHandler {
    /// Take one result row. Returns true once no more rows are wanted.
    fn handle(&mut self, record: OutputRecord, writer: &mut dyn RowWriter) -> RowqlResult<bool>;

    /// Write whatever was buffered.
    fn finish(&mut self, writer: &mut dyn RowWriter) -> RowqlResult<()>;

    fn rows_written(&self) -> u64;

    fn is_done(&self) -> bool;
}

/// Pick the handler for a query.
pub fn make_handler(query: &ParsedQuery) -> Box<dyn OutputHandler> {
    let sink = LimitedSink::new(query.limit, query.offset);
    if query.has_group_by() && !query.partials {
        Box::new(GroupByConsolidated::new(sink, query.order_by.clone()))
    } else if query.has_order_by() {
        Box::new(BufferedSort::new(sink, query.order_by.clone(), query.distinct))
    } else if query.distinct {
        Box::new(StreamingDistinct::new(sink))
    } else {
        Box::new(PassThrough::new(sink))
    }
}

/// OFFSET/LIMIT bookkeeping in front of the writer.
#[derive(Debug, Clone)]
pub struct LimitedSink {
    limit: Option<u64>,
    to_skip: u64,
    written: u64,
}

impl LimitedSink {
    pub fn new(limit: Option<u64>, offset: u64) -> Self {
        Self {
            limit,
            to_skip: offset,
            written: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.limit.map_or(false, |limit| self.written >= limit)
    }

    pub fn write(&mut self, values: Vec<Value>, writer: &mut dyn RowWriter) -> RowqlResult<()> {
        if self.to_skip > 0 {
            self.to_skip -= 1;
            return Ok(());
        }
        writer.write_row(values)?;
        self.written += 1;
        Ok(())
    }

    /// Write buffered rows in order until the limit is reached.
    fn drain(
        &mut self,
        records: impl IntoIterator<Item = OutputRecord>,
        writer: &mut dyn RowWriter,
    ) -> RowqlResult<()> {
        for record in records {
            if self.is_done() {
                break;
            }
            self.write(record.values, writer)?;
        }
        Ok(())
    }
}

/// Writes every row as it comes.
pub struct PassThrough {
    sink: LimitedSink,
}

impl PassThrough {
    pub fn new(sink: LimitedSink) -> Self {
        Self { sink }
    }
}

impl OutputHandler for PassThrough {
    fn handle(&mut self, record: OutputRecord, writer: &mut dyn RowWriter) -> RowqlResult<bool> {
        self.sink.write(record.values, writer)?;
        Ok(self.sink.is_done())
    }

    fn finish(&mut self, _writer: &mut dyn RowWriter) -> RowqlResult<()> {
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.sink.written
    }

    fn is_done(&self) -> bool {
        self.sink.is_done()
    }
}

/// Writes a row the first time its projected tuple is seen.
pub struct StreamingDistinct {
    sink: LimitedSink,
    seen: HashSet<String>,
}

impl StreamingDistinct {
    pub fn new(sink: LimitedSink) -> Self {
        Self {
            sink,
            seen: HashSet::new(),
        }
    }
}

impl OutputHandler for StreamingDistinct {
    fn handle(&mut self, record: OutputRecord, writer: &mut dyn RowWriter) -> RowqlResult<bool> {
        if self.seen.insert(tuple_key(&record.values)) {
            self.sink.write(record.values, writer)?;
        }
        Ok(self.sink.is_done())
    }

    fn finish(&mut self, _writer: &mut dyn RowWriter) -> RowqlResult<()> {
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.sink.written
    }

    fn is_done(&self) -> bool {
        self.sink.is_done()
    }
}

/// Keeps the latest row of every group; groups come out in first-seen
/// order unless ORDER BY is given.
pub struct GroupByConsolidated {
    sink: LimitedSink,
    order_by: Vec<OrderKey>,
    index: HashMap<String, usize>,
    groups: Vec<OutputRecord>,
}

impl GroupByConsolidated {
    pub fn new(sink: LimitedSink, order_by: Vec<OrderKey>) -> Self {
        Self {
            sink,
            order_by,
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl OutputHandler for GroupByConsolidated {
    fn handle(&mut self, record: OutputRecord, _writer: &mut dyn RowWriter) -> RowqlResult<bool> {
        match self.index.get(&record.group_key) {
            Some(&i) => self.groups[i] = record,
            None => {
                self.index.insert(record.group_key.clone(), self.groups.len());
                self.groups.push(record);
            }
        }
        Ok(false)
    }

    fn finish(&mut self, writer: &mut dyn RowWriter) -> RowqlResult<()> {
        let mut groups = std::mem::take(&mut self.groups);
        self.index.clear();
        if !self.order_by.is_empty() {
            sort_records(&mut groups, &self.order_by);
        }
        self.sink.drain(groups, writer)
    }

    fn rows_written(&self) -> u64 {
        self.sink.written
    }

    fn is_done(&self) -> bool {
        self.sink.is_done()
    }
}

/// Buffers all rows (one per distinct tuple with DISTINCT) and sorts them
/// at the end.
pub struct BufferedSort {
    sink: LimitedSink,
    order_by: Vec<OrderKey>,
    distinct: Option<HashSet<String>>,
    rows: Vec<OutputRecord>,
}

impl BufferedSort {
    pub fn new(sink: LimitedSink, order_by: Vec<OrderKey>, distinct: bool) -> Self {
        Self {
            sink,
            order_by,
            distinct: distinct.then(HashSet::new),
            rows: Vec::new(),
        }
    }
}

impl OutputHandler for BufferedSort {
    fn handle(&mut self, record: OutputRecord, _writer: &mut dyn RowWriter) -> RowqlResult<bool> {
        if let Some(seen) = self.distinct.as_mut() {
            if !seen.insert(tuple_key(&record.values)) {
                return Ok(false);
            }
        }
        self.rows.push(record);
        Ok(false)
    }

    fn finish(&mut self, writer: &mut dyn RowWriter) -> RowqlResult<()> {
        let mut rows = std::mem::take(&mut self.rows);
        tracing::debug!(rows = rows.len(), "sorting buffered output");
        sort_records(&mut rows, &self.order_by);
        self.sink.drain(rows, writer)
    }

    fn rows_written(&self) -> u64 {
        self.sink.written
    }

    fn is_done(&self) -> bool {
        self.sink.is_done()
    }
}
