//! HTML triage report over decoded records.
use crate::err::{Result, UsageStatsError};
use crate::record::CanonicalRecord;
use crate::sink::RecordSink;
use crate::time::format_epoch_ms;

use quick_xml::escape::escape;
use std::cmp::Reverse;
use std::io::Write;

const COLUMNS: [&str; 9] = [
    "Usage Type",
    "Last Time Active (UTC)",
    "Time Active in Msecs",
    "Time Active in Secs",
    "App Launch Count",
    "Package",
    "Event Type",
    "Class",
    "Frequency",
];

/// Buffers every record and renders a single HTML table on [`RecordSink::finish`], most
/// recently active first.
pub struct HtmlReportSink<W: Write> {
    writer: W,
    records: Vec<CanonicalRecord>,
}

impl<W: Write> HtmlReportSink<W> {
    pub fn new(writer: W) -> Self {
        HtmlReportSink {
            writer,
            records: Vec::new(),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for HtmlReportSink<W> {
    fn consume(&mut self, record: CanonicalRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        sort_for_report(&mut self.records);
        render(&mut self.writer, &self.records)
            .and_then(|_| self.writer.flush())
            .map_err(|source| UsageStatsError::Output { source })
    }
}

/// Descending `last_time_active`, records without one go last. Ties keep decode order.
pub fn sort_for_report(records: &mut [CanonicalRecord]) {
    records.sort_by_key(|r| (r.last_time_active.is_none(), Reverse(r.last_time_active)));
}

fn render<W: Write>(w: &mut W, records: &[CanonicalRecord]) -> std::io::Result<()> {
    writeln!(w, "<html><body>")?;
    writeln!(w, "<h2>Android usagestats report</h2>")?;
    writeln!(
        w,
        "<style> table, th, td {{border: 1px solid black; border-collapse: collapse;}}</style>"
    )?;
    writeln!(w, "<table>")?;

    write!(w, "<tr>")?;
    for column in COLUMNS {
        write!(w, "<th>{column}</th>")?;
    }
    writeln!(w, "</tr>")?;

    for record in records {
        let cells = [
            record.usage_type.clone(),
            record
                .last_time_active
                .and_then(format_epoch_ms)
                .unwrap_or_default(),
            optional(record.time_active_ms),
            optional(record.time_active_ms.map(|ms| ms / 1000)),
            optional(record.app_launch_count),
            record.package.clone().unwrap_or_default(),
            record.event_type.clone().unwrap_or_default(),
            record.class_name.clone().unwrap_or_default(),
            record.frequency.clone(),
        ];

        write!(w, "<tr>")?;
        for cell in &cells {
            write!(w, "<td>{}</td>", escape(cell.as_str()))?;
        }
        writeln!(w, "</tr>")?;
    }

    writeln!(w, "</table>")?;
    writeln!(w, "</body></html>")
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
