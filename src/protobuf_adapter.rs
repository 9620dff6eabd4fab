use crate::err::{RecordError, RecordResult, Result};
use crate::proto::{Configuration, Event, IntervalStatsProto, UsageStats};
use crate::record::{
    CanonicalRecord, USAGE_TYPE_CONFIGURATIONS, USAGE_TYPE_EVENT_LOG, USAGE_TYPE_PACKAGES,
};
use crate::symbols::{event_flag_names, event_type_name};
use crate::time::{base_epoch_from_file_name, reconstruct};

use log::{debug, trace, warn};
use serde::Serialize;
use serde_json::{Map, Value};

/// Resolves the 1-based `*_index` fields of an interval against its string pool.
#[derive(Debug, Clone, Copy)]
struct StringPool<'a> {
    strings: &'a [String],
}

impl<'a> StringPool<'a> {
    /// `None` and `0` both mean "no string". Anything past the end of the pool is an error.
    fn resolve(&self, field: &'static str, index: Option<i32>) -> RecordResult<Option<&'a str>> {
        let index = match index {
            None | Some(0) => return Ok(None),
            Some(index) => index,
        };

        usize::try_from(index)
            .ok()
            .and_then(|one_based| self.strings.get(one_based - 1))
            .map(|s| Some(s.as_str()))
            .ok_or(RecordError::StringPoolIndexOutOfBounds {
                field,
                index,
                pool_len: self.strings.len(),
            })
    }
}

/// Builds canonical records from a decoded interval, deriving the base time from `file_name`.
pub fn extract(
    message: &IntervalStatsProto,
    file_name: &str,
    frequency: &str,
) -> Result<Vec<CanonicalRecord>> {
    let base_epoch_ms = base_epoch_from_file_name(file_name)?;
    Ok(extract_with_base(message, base_epoch_ms, frequency))
}

/// Builds canonical records for packages, then configurations, then the event log.
///
/// Entries that reference a string outside the pool are dropped (and logged), the rest of the
/// interval is still extracted.
pub fn extract_with_base(
    message: &IntervalStatsProto,
    base_epoch_ms: i64,
    frequency: &str,
) -> Vec<CanonicalRecord> {
    let pool = StringPool {
        strings: message.strings(),
    };
    let mut records = Vec::with_capacity(
        message.packages.len() + message.configurations.len() + message.event_log.len(),
    );

    for (i, usage_stats) in message.packages.iter().enumerate() {
        match package_record(usage_stats, pool, base_epoch_ms, frequency) {
            Ok(record) => records.push(record),
            Err(e) => warn!("dropping packages entry {i}: {e}"),
        }
    }

    for configuration in &message.configurations {
        records.push(configuration_record(configuration, base_epoch_ms, frequency));
    }

    for (i, event) in message.event_log.iter().enumerate() {
        match event_record(event, pool, base_epoch_ms, frequency) {
            Ok(record) => records.push(record),
            Err(e) => warn!("dropping event-log entry {i}: {e}"),
        }
    }

    debug!(
        "extracted {} of {} protobuf entries",
        records.len(),
        message.packages.len() + message.configurations.len() + message.event_log.len()
    );

    records
}

fn package_record(
    usage_stats: &UsageStats,
    pool: StringPool<'_>,
    base_epoch_ms: i64,
    frequency: &str,
) -> RecordResult<CanonicalRecord> {
    let package = pool
        .resolve("package_index", usage_stats.package_index)?
        .or(usage_stats.package.as_deref());

    let mut attributes = present_fields(usage_stats);
    if let Some(package) = package {
        attributes.insert("package_name".to_owned(), Value::from(package));
    }

    let mut record = CanonicalRecord::new(USAGE_TYPE_PACKAGES, frequency);
    record.last_time_active = reconstruct(usage_stats.last_time_active_ms, base_epoch_ms);
    record.time_active_ms = usage_stats.total_time_active_ms.and_then(i64::checked_abs);
    record.app_launch_count = usage_stats
        .app_launch_count
        .map(|count| i64::from(count).abs());
    record.package = package.map(str::to_owned);
    record.raw_attributes = Value::Object(attributes).to_string();

    trace!("{record:?}");
    Ok(record)
}

fn configuration_record(
    configuration: &Configuration,
    base_epoch_ms: i64,
    frequency: &str,
) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(USAGE_TYPE_CONFIGURATIONS, frequency);
    record.last_time_active = reconstruct(configuration.last_time_active_ms, base_epoch_ms);
    record.time_active_ms = configuration
        .total_time_active_ms
        .and_then(i64::checked_abs);
    record.raw_attributes = Value::Object(present_fields(configuration)).to_string();

    trace!("{record:?}");
    record
}

fn event_record(
    event: &Event,
    pool: StringPool<'_>,
    base_epoch_ms: i64,
    frequency: &str,
) -> RecordResult<CanonicalRecord> {
    let package = pool
        .resolve("package_index", event.package_index)?
        .or(event.package.as_deref());
    let class_name = pool
        .resolve("class_index", event.class_index)?
        .or(event.class.as_deref());
    let event_type = event.r#type.map(event_type_name);

    let mut attributes = present_fields(event);
    if let Some(package) = package {
        attributes.insert("package_name".to_owned(), Value::from(package));
    }
    if let Some(class_name) = class_name {
        attributes.insert("class_name".to_owned(), Value::from(class_name));
    }
    if let Some(event_type) = &event_type {
        attributes.insert("type_name".to_owned(), Value::from(event_type.as_str()));
    }
    if let Some(flags) = event.flags {
        attributes.insert("flag_names".to_owned(), Value::from(event_flag_names(flags)));
    }

    let mut record = CanonicalRecord::new(USAGE_TYPE_EVENT_LOG, frequency);
    record.last_time_active = reconstruct(event.time_ms, base_epoch_ms);
    record.package = package.map(str::to_owned);
    record.class_name = class_name.map(str::to_owned);
    record.event_type = event_type;
    record.raw_attributes = Value::Object(attributes).to_string();

    trace!("{record:?}");
    Ok(record)
}

/// Serializes a message into an ordered JSON object, leaving out unset fields.
fn present_fields<T: Serialize>(message: &T) -> Map<String, Value> {
    match serde_json::to_value(message) {
        Ok(Value::Object(map)) => without_nulls(map),
        Ok(_) => Map::new(),
        Err(e) => {
            warn!("failed to serialize protobuf entry: {e}");
            Map::new()
        }
    }
}

fn without_nulls(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Object(inner) => Some((key, Value::Object(without_nulls(inner)))),
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some((
                key,
                Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(inner) => Value::Object(without_nulls(inner)),
                            other => other,
                        })
                        .collect(),
                ),
            )),
            other => Some((key, other)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{ConfigurationProto, StringPool as StringPoolProto};
    use pretty_assertions::assert_eq;

    const BASE: i64 = 1_000_000_000_000;

    fn interval(strings: &[&str]) -> IntervalStatsProto {
        IntervalStatsProto {
            stringpool: Some(StringPoolProto {
                size: Some(strings.len() as i32),
                strings: strings.iter().map(|s| s.to_string()).collect(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_package_entry_resolves_pool_and_time() {
        let mut message = interval(&["com.example.app"]);
        message.packages.push(UsageStats {
            package_index: Some(1),
            last_time_active_ms: Some(86_400_000),
            total_time_active_ms: Some(-5_000),
            app_launch_count: Some(3),
            ..Default::default()
        });

        let records = extract_with_base(&message, BASE, "daily");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.usage_type, "packages");
        assert_eq!(record.last_time_active, Some(1_000_086_400_000));
        assert_eq!(record.time_active_ms, Some(5_000));
        assert_eq!(record.app_launch_count, Some(3));
        assert_eq!(record.package.as_deref(), Some("com.example.app"));
        assert_eq!(record.frequency, "daily");
        assert_eq!(
            record.raw_attributes,
            r#"{"package_index":1,"last_time_active_ms":86400000,"total_time_active_ms":-5000,"app_launch_count":3,"package_name":"com.example.app"}"#
        );
    }

    #[test]
    fn test_absent_package_fields_stay_absent() {
        let mut message = interval(&["com.example.app"]);
        message.packages.push(UsageStats {
            package_index: Some(0),
            ..Default::default()
        });

        let records = extract_with_base(&message, BASE, "weekly");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].package, None);
        assert_eq!(records[0].last_time_active, None);
        assert_eq!(records[0].time_active_ms, None);
        assert_eq!(records[0].app_launch_count, None);
    }

    #[test]
    fn test_out_of_bounds_index_drops_only_that_record() {
        let mut message = interval(&["com.example.app"]);
        message.packages.push(UsageStats {
            package_index: Some(2),
            ..Default::default()
        });
        message.packages.push(UsageStats {
            package_index: Some(1),
            ..Default::default()
        });
        message.event_log.push(Event {
            package_index: Some(1),
            class_index: Some(-4),
            ..Default::default()
        });
        message.event_log.push(Event {
            package_index: Some(1),
            r#type: Some(1),
            ..Default::default()
        });

        let records = extract_with_base(&message, BASE, "daily");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].usage_type, "packages");
        assert_eq!(records[0].package.as_deref(), Some("com.example.app"));
        assert_eq!(records[1].usage_type, "event-log");
        assert_eq!(records[1].event_type.as_deref(), Some("MOVE_TO_FOREGROUND"));
    }

    #[test]
    fn test_event_entries() {
        let mut message = interval(&["com.example.app", "com.example.app.MainActivity"]);
        message.event_log.push(Event {
            package_index: Some(1),
            class_index: Some(2),
            time_ms: Some(1_000),
            r#type: Some(8),
            flags: Some(1),
            ..Default::default()
        });
        message.event_log.push(Event {
            package_index: Some(1),
            time_ms: Some(-1_600_000_000_000),
            r#type: Some(42),
            ..Default::default()
        });

        let records = extract_with_base(&message, BASE, "daily");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_type.as_deref(), Some("SHORTCUT_INVOCATION"));
        assert_eq!(
            records[0].class_name.as_deref(),
            Some("com.example.app.MainActivity")
        );
        assert_eq!(records[0].last_time_active, Some(BASE + 1_000));
        assert!(
            records[0]
                .raw_attributes
                .contains(r#""flag_names":["FLAG_IS_PACKAGE_INSTANT_APP"]"#)
        );
        assert_eq!(records[1].event_type.as_deref(), Some("42"));
        assert_eq!(records[1].class_name, None);
        assert_eq!(records[1].last_time_active, Some(1_600_000_000_000));
    }

    #[test]
    fn test_configuration_entries_carry_descriptor() {
        let mut message = interval(&[]);
        message.configurations.push(Configuration {
            config: Some(ConfigurationProto {
                mcc: Some(204),
                orientation: Some(1),
                ..Default::default()
            }),
            last_time_active_ms: Some(10),
            total_time_active_ms: Some(20),
            count: Some(2),
            active: None,
        });

        let records = extract_with_base(&message, BASE, "monthly");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].usage_type, "configurations");
        assert_eq!(records[0].last_time_active, Some(BASE + 10));
        assert_eq!(records[0].time_active_ms, Some(20));
        assert_eq!(records[0].package, None);
        assert_eq!(
            records[0].raw_attributes,
            r#"{"config":{"mcc":204,"orientation":1},"last_time_active_ms":10,"total_time_active_ms":20,"count":2}"#
        );
    }

    #[test]
    fn test_records_follow_collection_order() {
        let mut message = interval(&["a", "b"]);
        message.event_log.push(Event {
            package_index: Some(2),
            ..Default::default()
        });
        message.configurations.push(Configuration::default());
        message.packages.push(UsageStats {
            package_index: Some(1),
            ..Default::default()
        });
        message.packages.push(UsageStats {
            package_index: Some(2),
            ..Default::default()
        });

        let kinds: Vec<(String, Option<String>)> = extract_with_base(&message, BASE, "daily")
            .into_iter()
            .map(|r| (r.usage_type, r.package))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("packages".to_owned(), Some("a".to_owned())),
                ("packages".to_owned(), Some("b".to_owned())),
                ("configurations".to_owned(), None),
                ("event-log".to_owned(), Some("b".to_owned())),
            ]
        );
    }

    #[test]
    fn test_inline_package_name_is_used_without_index() {
        let mut message = interval(&[]);
        message.packages.push(UsageStats {
            package: Some("com.inline".to_owned()),
            ..Default::default()
        });

        let records = extract_with_base(&message, BASE, "yearly");
        assert_eq!(records[0].package.as_deref(), Some("com.inline"));
    }
}
