use crate::err::{Result, UsageStatsError};
use crate::record::CanonicalRecord;

use std::io::Write;

/// Consumer of decoded records, e.g. storage or a report.
pub trait RecordSink {
    fn consume(&mut self, record: CanonicalRecord) -> Result<()>;

    /// Called once after the last record.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn consume(&mut self, record: CanonicalRecord) -> Result<()> {
        (**self).consume(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<CanonicalRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }

    pub fn into_records(self) -> Vec<CanonicalRecord> {
        self.records
    }
}

impl RecordSink for VecSink {
    fn consume(&mut self, record: CanonicalRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

/// Writes every record as a JSON object, one per line unless `indent` is set.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    indent: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, indent: bool) -> Self {
        JsonLinesSink { writer, indent }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn consume(&mut self, record: CanonicalRecord) -> Result<()> {
        if self.indent {
            serde_json::to_writer_pretty(&mut self.writer, &record)?;
        } else {
            serde_json::to_writer(&mut self.writer, &record)?;
        }
        writeln!(self.writer).map_err(|source| UsageStatsError::Output { source })
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|source| UsageStatsError::Output { source })
    }
}
