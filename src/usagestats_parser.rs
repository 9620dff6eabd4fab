use crate::err::Result;
use crate::proto::IntervalStatsProto;
use crate::record::{DecodeOutcome, DecodedArtifact, IntervalMetadata};
use crate::time::base_epoch_from_file_name;
use crate::xml_tree::parse_tree;
use crate::{protobuf_adapter, xml_adapter};

use log::debug;

/// Settings for decoding many artifacts.
///
/// A single [`decode`] call needs none of these; they drive the batch driver and the sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Number of worker threads, `0` lets rayon decide.
    num_threads: usize,
    /// Pretty-print JSON output.
    indent: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            num_threads: 0,
            indent: true,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Sets the number of worker threads.
    /// `0` will let rayon decide, `1` decodes on the calling thread.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if cfg!(feature = "multithreading") {
            num_threads
        } else {
            1
        };
        self
    }

    /// Sets whether JSON output should be indented.
    pub fn indent(mut self, pretty: bool) -> Self {
        self.indent = pretty;
        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn should_indent(&self) -> bool {
        self.indent
    }
}

/// Decodes one usagestats artifact.
///
/// `file_name` must be the artifact's epoch-millisecond base time (all decimal digits), anything
/// else fails the call. `frequency` is copied onto every record.
///
/// XML is tried first; only if the bytes are not a well-formed XML tree are they decoded as an
/// interval-stats protobuf. When both fail the outcome is [`DecodeOutcome::Unrecognized`] and no
/// records are returned, which is not an error.
pub fn decode(file_name: &str, bytes: &[u8], frequency: &str) -> Result<DecodedArtifact> {
    let base_epoch_ms = base_epoch_from_file_name(file_name)?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!("{file_name}: artifact is empty");
        return Ok(DecodedArtifact::without_records(DecodeOutcome::Empty));
    }

    let xml_error = match parse_tree(bytes) {
        Ok(root) => {
            debug!("{file_name}: decoded as xml (root <{}>)", root.name);
            return Ok(DecodedArtifact {
                records: xml_adapter::extract_with_base(&root, base_epoch_ms, frequency),
                outcome: DecodeOutcome::XmlOk,
                interval: None,
            });
        }
        Err(e) => e,
    };
    debug!("{file_name}: not xml ({xml_error}), trying protobuf");

    match IntervalStatsProto::from_bytes(bytes) {
        Ok(message) => {
            let interval = IntervalMetadata {
                end_time_ms: message.end_time_ms,
                major_version: message.major_version,
                minor_version: message.minor_version,
            };
            debug!("{file_name}: decoded as protobuf {interval:?}");

            Ok(DecodedArtifact {
                records: protobuf_adapter::extract_with_base(&message, base_epoch_ms, frequency),
                outcome: DecodeOutcome::ProtobufOk,
                interval: Some(interval),
            })
        }
        Err(protobuf_error) => {
            debug!("{file_name}: not protobuf either ({protobuf_error})");
            Ok(DecodedArtifact::without_records(
                DecodeOutcome::Unrecognized {
                    xml_error: xml_error.to_string(),
                    protobuf_error: protobuf_error.to_string(),
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_env_logger_initialized;
    use crate::err::UsageStatsError;
    use crate::proto::{Event, StringPool, UsageStats};
    use pretty_assertions::assert_eq;
    use prost::Message;

    fn protobuf_artifact() -> Vec<u8> {
        IntervalStatsProto {
            end_time_ms: Some(86_400_000),
            stringpool: Some(StringPool {
                size: Some(1),
                strings: vec!["com.example.app".to_owned()],
            }),
            major_version: Some(1),
            minor_version: Some(1),
            packages: vec![UsageStats {
                package_index: Some(1),
                last_time_active_ms: Some(86_400_000),
                ..Default::default()
            }],
            configurations: vec![],
            event_log: vec![Event {
                package_index: Some(1),
                r#type: Some(8),
                ..Default::default()
            }],
        }
        .encode_to_vec()
    }

    #[test]
    fn test_xml_is_dispatched_to_xml_adapter() {
        ensure_env_logger_initialized();
        let xml = br#"<usagestats><packages><package lastTimeActive="-1500000000000" package="com.example.app" timeActive="42" /></packages></usagestats>"#;

        let decoded = decode("1000", xml, "daily").unwrap();

        assert_eq!(decoded.outcome, DecodeOutcome::XmlOk);
        assert_eq!(decoded.interval, None);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].last_time_active, Some(1_500_000_000_000));
    }

    #[test]
    fn test_protobuf_is_dispatched_to_protobuf_adapter() {
        ensure_env_logger_initialized();
        let decoded = decode("1000000000000", &protobuf_artifact(), "daily").unwrap();

        assert_eq!(decoded.outcome, DecodeOutcome::ProtobufOk);
        assert_eq!(
            decoded.interval,
            Some(IntervalMetadata {
                end_time_ms: Some(86_400_000),
                major_version: Some(1),
                minor_version: Some(1),
            })
        );
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].last_time_active, Some(1_000_086_400_000));
        assert_eq!(
            decoded.records[1].event_type.as_deref(),
            Some("SHORTCUT_INVOCATION")
        );
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        ensure_env_logger_initialized();
        let garbage = [0xff_u8; 32];

        let decoded = decode("1000", &garbage, "daily").unwrap();

        assert!(decoded.records.is_empty());
        assert!(matches!(decoded.outcome, DecodeOutcome::Unrecognized { .. }));
        assert!(!decoded.outcome.is_ok());
    }

    #[test]
    fn test_truncated_protobuf_is_unrecognized() {
        let mut bytes = protobuf_artifact();
        bytes.truncate(bytes.len() - 3);

        let decoded = decode("1000", &bytes, "daily").unwrap();

        assert!(matches!(decoded.outcome, DecodeOutcome::Unrecognized { .. }));
        assert!(decoded.records.is_empty());
    }

    #[test]
    fn test_empty_artifact() {
        let decoded = decode("1000", b"", "daily").unwrap();
        assert_eq!(decoded.outcome, DecodeOutcome::Empty);
        assert!(decoded.records.is_empty());
    }

    #[test]
    fn test_malformed_file_name_fails_the_call() {
        let err = decode("usage.xml", b"<usagestats/>", "daily").unwrap_err();
        assert!(matches!(err, UsageStatsError::MalformedFileName { .. }));
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let bytes = protobuf_artifact();
        assert_eq!(
            decode("42", &bytes, "yearly").unwrap(),
            decode("42", &bytes, "yearly").unwrap()
        );
    }

    #[test]
    fn test_settings_builder() {
        let settings = ParserSettings::new().indent(false);
        assert!(!settings.should_indent());
        assert_eq!(settings.get_num_threads(), 0);
    }
}
