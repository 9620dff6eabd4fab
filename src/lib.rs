#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use batch::{
    ArtifactCandidate, BatchStats, Frequency, decode_batch, decode_candidate, discover_artifacts,
};
pub use err::{RecordError, Result, UsageStatsError, XmlStructureError};
pub use proto::IntervalStatsProto;
pub use record::{
    CanonicalRecord, DecodeOutcome, DecodedArtifact, IntervalMetadata, USAGE_TYPE_CONFIGURATIONS,
    USAGE_TYPE_EVENT_LOG, USAGE_TYPE_PACKAGES,
};
pub use report::HtmlReportSink;
pub use sink::{JsonLinesSink, RecordSink, VecSink};
pub use symbols::{EventFlags, EventType, event_flag_names, event_type_name};
pub use time::{base_epoch_from_file_name, format_epoch_ms, reconstruct};
pub use usagestats_parser::{ParserSettings, decode};
pub use xml_tree::{XmlElement, parse_tree};

pub mod batch;
pub mod err;
pub mod proto;
pub mod protobuf_adapter;
mod record;
pub mod report;
pub mod sink;
mod symbols;
mod time;
mod usagestats_parser;
pub mod xml_adapter;
mod xml_tree;

#[cfg(test)]
use std::sync::Once;
#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
