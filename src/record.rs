use serde::Serialize;
use std::fmt;

pub const USAGE_TYPE_PACKAGES: &str = "packages";
pub const USAGE_TYPE_CONFIGURATIONS: &str = "configurations";
pub const USAGE_TYPE_EVENT_LOG: &str = "event-log";

/// One normalized usagestats entry, independent of the on-disk format it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub usage_type: String,
    /// Absolute epoch milliseconds.
    pub last_time_active: Option<i64>,
    pub time_active_ms: Option<i64>,
    pub app_launch_count: Option<i64>,
    pub package: Option<String>,
    pub class_name: Option<String>,
    pub event_type: Option<String>,
    /// Every source field of the entry, as an ordered JSON object.
    pub raw_attributes: String,
    pub frequency: String,
}

impl CanonicalRecord {
    /// A record with every typed field absent.
    pub(crate) fn new(usage_type: impl Into<String>, frequency: &str) -> Self {
        CanonicalRecord {
            usage_type: usage_type.into(),
            last_time_active: None,
            time_active_ms: None,
            app_launch_count: None,
            package: None,
            class_name: None,
            event_type: None,
            raw_attributes: String::from("{}"),
            frequency: frequency.to_owned(),
        }
    }
}

/// How a single artifact was (or was not) understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecodeOutcome {
    XmlOk,
    ProtobufOk,
    /// The artifact had no content at all.
    Empty,
    /// Neither decoder accepted the bytes. Both reasons are kept for the caller's logs.
    Unrecognized { xml_error: String, protobuf_error: String },
}

impl DecodeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, DecodeOutcome::XmlOk | DecodeOutcome::ProtobufOk)
    }
}

impl fmt::Display for DecodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeOutcome::XmlOk => f.write_str("xml"),
            DecodeOutcome::ProtobufOk => f.write_str("protobuf"),
            DecodeOutcome::Empty => f.write_str("empty"),
            DecodeOutcome::Unrecognized {
                xml_error,
                protobuf_error,
            } => write!(
                f,
                "unrecognized (as xml: {xml_error}; as protobuf: {protobuf_error})"
            ),
        }
    }
}

/// Header fields of a protobuf interval-stats message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalMetadata {
    pub end_time_ms: Option<i64>,
    pub major_version: Option<i32>,
    pub minor_version: Option<i32>,
}

/// Everything a single `decode` call produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArtifact {
    pub records: Vec<CanonicalRecord>,
    pub outcome: DecodeOutcome,
    /// Only present for protobuf artifacts.
    pub interval: Option<IntervalMetadata>,
}

impl DecodedArtifact {
    pub(crate) fn without_records(outcome: DecodeOutcome) -> Self {
        DecodedArtifact {
            records: Vec::new(),
            outcome,
            interval: None,
        }
    }
}
