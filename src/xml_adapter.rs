use crate::err::Result;
use crate::record::CanonicalRecord;
use crate::time::{base_epoch_from_file_name, reconstruct};
use crate::xml_tree::XmlElement;

use log::{debug, trace, warn};
use serde_json::{Map, Value};

/// Builds canonical records from a legacy usagestats XML tree, deriving the base time from
/// `file_name`.
pub fn extract(root: &XmlElement, file_name: &str, frequency: &str) -> Result<Vec<CanonicalRecord>> {
    let base_epoch_ms = base_epoch_from_file_name(file_name)?;
    Ok(extract_with_base(root, base_epoch_ms, frequency))
}

/// Every child of every top-level category element becomes one record, in document order.
///
/// ```text
/// <usagestats>
///     <packages>                        <- usage_type
///         <package lastTimeActive="-1589192784125" package="com.android.settings"
///                  timeActive="0" lastEvent="0" />
///     </packages>
/// </usagestats>
/// ```
pub fn extract_with_base(
    root: &XmlElement,
    base_epoch_ms: i64,
    frequency: &str,
) -> Vec<CanonicalRecord> {
    let mut records = Vec::new();

    for category in &root.children {
        for entry in &category.children {
            records.push(entry_record(&category.name, entry, base_epoch_ms, frequency));
        }
    }

    debug!(
        "extracted {} records from {} xml categories",
        records.len(),
        root.children.len()
    );

    records
}

fn entry_record(
    usage_type: &str,
    entry: &XmlElement,
    base_epoch_ms: i64,
    frequency: &str,
) -> CanonicalRecord {
    let attributes: Map<String, Value> = entry
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect();

    let mut record = CanonicalRecord::new(usage_type, frequency);
    record.last_time_active = reconstruct(int_attribute(entry, "lastTimeActive"), base_epoch_ms);
    record.time_active_ms = int_attribute(entry, "timeActive");
    record.app_launch_count = int_attribute(entry, "appLaunchCount");
    record.class_name = entry.attribute("class").map(str::to_owned);
    record.event_type = entry.attribute("type").map(str::to_owned);
    record.package = entry.attribute("package").map(str::to_owned);
    record.raw_attributes = Value::Object(attributes).to_string();

    trace!("{record:?}");
    record
}

/// Reads an integer attribute. Values that don't parse are treated as absent.
fn int_attribute(entry: &XmlElement, key: &str) -> Option<i64> {
    let value = entry.attribute(key)?;
    match value.trim().parse::<i64>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                "<{}> attribute `{key}` has non-integer value `{value}` ({e}), ignoring it",
                entry.name
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml_tree::parse_tree;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_package_entry() {
        let root = parse_tree(
            br#"<usagestats>
                <packages>
                    <package lastTimeActive="-1500000000000" package="com.example.app" timeActive="42" />
                </packages>
            </usagestats>"#,
        )
        .unwrap();

        let records = extract(&root, "1499990000000", "daily").unwrap();

        assert_eq!(
            records,
            vec![CanonicalRecord {
                usage_type: "packages".to_owned(),
                last_time_active: Some(1_500_000_000_000),
                time_active_ms: Some(42),
                app_launch_count: None,
                package: Some("com.example.app".to_owned()),
                class_name: None,
                event_type: None,
                raw_attributes: r#"{"lastTimeActive":"-1500000000000","package":"com.example.app","timeActive":"42"}"#.to_owned(),
                frequency: "daily".to_owned(),
            }]
        );
    }

    #[test]
    fn test_event_log_entry_keeps_raw_type() {
        let root = parse_tree(
            br#"<usagestats>
                <event-log>
                    <event lastTimeActive="500" package="com.example.app" class="com.example.app.Main" type="7" />
                </event-log>
            </usagestats>"#,
        )
        .unwrap();

        let records = extract_with_base(&root, 1_000, "weekly");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].usage_type, "event-log");
        assert_eq!(records[0].last_time_active, Some(1_500));
        assert_eq!(records[0].event_type.as_deref(), Some("7"));
        assert_eq!(records[0].class_name.as_deref(), Some("com.example.app.Main"));
    }

    #[test]
    fn test_zero_is_not_absent() {
        let root = parse_tree(
            br#"<usagestats><packages>
                <package package="a" timeActive="0" appLaunchCount="0" />
                <package package="b" />
            </packages></usagestats>"#,
        )
        .unwrap();

        let records = extract_with_base(&root, 0, "daily");

        assert_eq!(records[0].time_active_ms, Some(0));
        assert_eq!(records[0].app_launch_count, Some(0));
        assert_eq!(records[1].time_active_ms, None);
        assert_eq!(records[1].app_launch_count, None);
        assert_eq!(records[1].last_time_active, None);
    }

    #[test]
    fn test_empty_categories_contribute_nothing() {
        let root = parse_tree(
            br#"<usagestats><packages /><configurations></configurations><event-log /></usagestats>"#,
        )
        .unwrap();

        assert!(extract_with_base(&root, 0, "daily").is_empty());
    }

    #[test]
    fn test_unparsable_numbers_are_absent() {
        let root = parse_tree(
            br#"<usagestats><packages><package lastTimeActive="soon" timeActive="x" /></packages></usagestats>"#,
        )
        .unwrap();

        let records = extract_with_base(&root, 0, "daily");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_time_active, None);
        assert_eq!(records[0].time_active_ms, None);
    }

    #[test]
    fn test_document_order_is_kept() {
        let root = parse_tree(
            br#"<usagestats>
                <packages><package package="p1" /><package package="p2" /></packages>
                <configurations><config fs="1065353216" /></configurations>
                <event-log><event package="e1" type="1" /></event-log>
            </usagestats>"#,
        )
        .unwrap();

        let order: Vec<(String, Option<String>)> = extract_with_base(&root, 0, "daily")
            .into_iter()
            .map(|r| (r.usage_type, r.package))
            .collect();

        assert_eq!(
            order,
            vec![
                ("packages".to_owned(), Some("p1".to_owned())),
                ("packages".to_owned(), Some("p2".to_owned())),
                ("configurations".to_owned(), None),
                ("event-log".to_owned(), Some("e1".to_owned())),
            ]
        );
    }
}
